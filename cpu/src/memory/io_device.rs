/// Byte-granular access to an address space.
///
/// Multi-byte helpers are built on top of this; keeping the trait at byte
/// granularity makes the little-endian composition explicit in one place.
pub trait IoDevice {
    type Address;
    type Value;

    fn read_at(&self, address: Self::Address) -> Self::Value;
    fn write_at(&mut self, address: Self::Address, value: Self::Value);
}
