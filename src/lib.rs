/* hwbenchd core: device pool and backend drivers for USB hardware-debug and
 * fault-injection tools, the wire-protocol engines they speak (COBS/BPIO2,
 * SUMP, MPSSE, GDB/MI, glitch timing), and the cross-device trigger
 * coordinator. The terminal UI and the device enumerator are external
 * consumers of this crate. */
pub mod catalog;
pub mod coordinator;
pub mod device;
pub mod driver;
pub mod error;
pub mod framing;
pub mod pool;
pub mod proto;
pub mod sink;
