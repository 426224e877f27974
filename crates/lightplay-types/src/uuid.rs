//! Bluetooth UUIDs for LightPlay devices.
//!
//! The toy exposes a UART-style service: the host writes command frames to
//! the RX characteristic and the device notifies on the TX characteristic.

use uuid::{Uuid, uuid};

/// Primary LightPlay service UUID, used as the scan filter.
pub const LIGHTPLAY_SERVICE: Uuid = uuid!("6e400001-b5a3-f393-e0a9-e50e24dcca9e");

/// RX characteristic (host → device). Command frames are written here.
pub const RX_CHARACTERISTIC: Uuid = uuid!("6e400002-b5a3-f393-e0a9-e50e24dcca9e");

/// TX characteristic (device → host). Notifications arrive here.
pub const TX_CHARACTERISTIC: Uuid = uuid!("6e400003-b5a3-f393-e0a9-e50e24dcca9e");
