/* Wire-protocol engines: the binary framing, command and capture protocols
 * drivers build on. */
pub mod bpio;
pub mod bpio_fb;
pub mod gdbmi;
pub mod glitch;
pub mod mpsse;
pub mod sump;
