use logger::log;
use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::memory::io_device::IoDevice;

/// Size of the BIOS region in bytes.
pub const BIOS_SIZE: usize = 0x4000;

/// The GBA address map over flat region buffers.
///
/// Every region this core touches is backed by plain bytes: the I/O register
/// file has no side effects here, ROM is shared by its three mirrors, and
/// addresses outside every region read as zero and swallow writes. All
/// multi-byte accesses are little-endian, including misaligned ones, which
/// read or write the bytes at the given address without the rotation real
/// hardware performs.
#[derive(Serialize, Deserialize)]
pub struct InternalMemory {
    /// From 0x00000000 to 0x00003FFF (16 KiB).
    bios_system_rom: Vec<u8>,

    /// From 0x02000000 to 0x0203FFFF (256 KiB).
    working_ram: Vec<u8>,

    /// From 0x03000000 to 0x03007FFF (32 KiB).
    working_iram: Vec<u8>,

    /// From 0x04000000 to 0x040003FE. Plain bytes, no register semantics.
    io_registers: Vec<u8>,

    /// From 0x05000000 to 0x050003FF (1 KiB).
    palette_ram: Vec<u8>,

    /// From 0x06000000 to 0x06017FFF (96 KiB).
    video_ram: Vec<u8>,

    /// From 0x07000000 to 0x070003FF (1 KiB).
    obj_attributes: Vec<u8>,

    /// Cartridge ROM, mirrored at 0x08000000, 0x0A000000 and 0x0C000000.
    rom: Vec<u8>,

    /// From 0x0E000000 to 0x0E00FFFF (64 KiB).
    sram: Vec<u8>,
}

impl Default for InternalMemory {
    fn default() -> Self {
        Self::new([0_u8; BIOS_SIZE], vec![])
    }
}

impl InternalMemory {
    pub fn new(bios: [u8; BIOS_SIZE], rom: Vec<u8>) -> Self {
        Self {
            bios_system_rom: bios.to_vec(),
            working_ram: vec![0; 0x40000],
            working_iram: vec![0; 0x8000],
            io_registers: vec![0; 0x3FF],
            palette_ram: vec![0; 0x400],
            video_ram: vec![0; 0x18000],
            obj_attributes: vec![0; 0x400],
            rom,
            sram: vec![0; 0x10000],
        }
    }

    fn read_rom(&self, offset: usize) -> u8 {
        // Reads past the end of the image behave like unmapped space.
        self.rom.get(offset).copied().unwrap_or(0)
    }
}

impl IoDevice for InternalMemory {
    type Address = usize;
    type Value = u8;

    fn read_at(&self, address: Self::Address) -> Self::Value {
        match address {
            0x00000000..=0x00003FFF => self.bios_system_rom[address],
            0x02000000..=0x0203FFFF => self.working_ram[address - 0x02000000],
            0x03000000..=0x03007FFF => self.working_iram[address - 0x03000000],
            0x04000000..=0x040003FE => self.io_registers[address - 0x04000000],
            0x05000000..=0x050003FF => self.palette_ram[address - 0x05000000],
            0x06000000..=0x06017FFF => self.video_ram[address - 0x06000000],
            0x07000000..=0x070003FF => self.obj_attributes[address - 0x07000000],
            0x08000000..=0x09FFFFFF => self.read_rom(address - 0x08000000),
            0x0A000000..=0x0BFFFFFF => self.read_rom(address - 0x0A000000),
            0x0C000000..=0x0DFFFFFF => self.read_rom(address - 0x0C000000),
            0x0E000000..=0x0E00FFFF => self.sram[address - 0x0E000000],
            _ => {
                log(format!("read on unmapped memory {address:#010X}"));
                0
            }
        }
    }

    fn write_at(&mut self, address: Self::Address, value: Self::Value) {
        match address {
            0x00000000..=0x00003FFF => self.bios_system_rom[address] = value,
            0x02000000..=0x0203FFFF => self.working_ram[address - 0x02000000] = value,
            0x03000000..=0x03007FFF => self.working_iram[address - 0x03000000] = value,
            0x04000000..=0x040003FE => self.io_registers[address - 0x04000000] = value,
            0x05000000..=0x050003FF => self.palette_ram[address - 0x05000000] = value,
            0x06000000..=0x06017FFF => self.video_ram[address - 0x06000000] = value,
            0x07000000..=0x070003FF => self.obj_attributes[address - 0x07000000] = value,
            0x08000000..=0x0DFFFFFF => {
                // The cartridge bus ignores writes.
                log(format!("write on ROM mirror {address:#010X} discarded"));
            }
            0x0E000000..=0x0E00FFFF => self.sram[address - 0x0E000000] = value,
            _ => {
                log(format!("write on unmapped memory {address:#010X} discarded"));
            }
        }
    }
}

impl InternalMemory {
    pub fn read_word(&self, address: usize) -> u32 {
        let part_0: u32 = self.read_at(address).into();
        let part_1: u32 = self.read_at(address.wrapping_add(1)).into();
        let part_2: u32 = self.read_at(address.wrapping_add(2)).into();
        let part_3: u32 = self.read_at(address.wrapping_add(3)).into();

        part_3 << 24 | part_2 << 16 | part_1 << 8 | part_0
    }

    pub fn write_word(&mut self, address: usize, value: u32) {
        self.write_at(address, value.get_bits(0..=7) as u8);
        self.write_at(address.wrapping_add(1), value.get_bits(8..=15) as u8);
        self.write_at(address.wrapping_add(2), value.get_bits(16..=23) as u8);
        self.write_at(address.wrapping_add(3), value.get_bits(24..=31) as u8);
    }

    pub fn read_half_word(&self, address: usize) -> u16 {
        let part_0: u16 = self.read_at(address).into();
        let part_1: u16 = self.read_at(address.wrapping_add(1)).into();

        part_1 << 8 | part_0
    }

    pub fn write_half_word(&mut self, address: usize, value: u16) {
        self.write_at(address, value.get_bits(0..=7) as u8);
        self.write_at(address.wrapping_add(1), value.get_bits(8..=15) as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn read_write_work_ram() {
        let mut im = InternalMemory::default();

        im.write_at(0x02000005, 5);
        assert_eq!(im.working_ram[5], 5);

        im.working_ram[0x3FFFF] = 10;
        assert_eq!(im.read_at(0x0203FFFF), 10);
    }

    #[test]
    fn read_write_iram() {
        let mut im = InternalMemory::default();

        im.write_at(0x03007FFF, 5);
        assert_eq!(im.working_iram[0x7FFF], 5);

        im.working_iram[5] = 10;
        assert_eq!(im.read_at(0x03000005), 10);
    }

    #[test]
    fn read_write_palette_ram() {
        let mut im = InternalMemory::default();

        im.write_at(0x05000008, 10);
        assert_eq!(im.palette_ram[8], 10);

        im.palette_ram[0x3FF] = 15;
        assert_eq!(im.read_at(0x050003FF), 15);
    }

    #[test]
    fn read_write_vram() {
        let mut im = InternalMemory::default();

        im.write_at(0x06000004, 23);
        assert_eq!(im.video_ram[4], 23);

        im.video_ram[0x17FFF] = 5;
        assert_eq!(im.read_at(0x06017FFF), 5);
    }

    #[test]
    fn read_write_oam() {
        let mut im = InternalMemory::default();

        im.write_at(0x07000134, 11);
        assert_eq!(im.obj_attributes[0x134], 11);
    }

    #[test]
    fn read_write_sram() {
        let mut im = InternalMemory::default();

        im.write_at(0x0E000000, 0xAB);
        assert_eq!(im.read_at(0x0E000000), 0xAB);
    }

    #[test]
    fn read_write_bios() {
        let mut im = InternalMemory::default();

        im.write_at(0x000001EC, 10);
        assert_eq!(im.read_at(0x000001EC), 10);
    }

    #[test]
    fn rom_mirrors_resolve_to_same_image() {
        let im = InternalMemory::new([0; BIOS_SIZE], vec![1, 2, 3, 4]);

        assert_eq!(im.read_at(0x08000000), 1);
        assert_eq!(im.read_at(0x0A000001), 2);
        assert_eq!(im.read_at(0x0C000003), 4);

        // Past the end of the image.
        assert_eq!(im.read_at(0x08000004), 0);
    }

    #[test]
    fn rom_writes_are_discarded() {
        let mut im = InternalMemory::new([0; BIOS_SIZE], vec![1, 2, 3, 4]);

        im.write_at(0x08000000, 0xFF);
        assert_eq!(im.read_at(0x08000000), 1);
    }

    #[test]
    fn unmapped_reads_zero_writes_discarded() {
        let mut im = InternalMemory::default();

        assert_eq!(im.read_at(0x01000000), 0);
        assert_eq!(im.read_at(0xF0000000), 0);

        im.write_at(0x01000000, 5);
        assert_eq!(im.read_at(0x01000000), 0);
    }

    #[test]
    fn check_read_word() {
        let mut im = InternalMemory::default();
        im.bios_system_rom[..4].copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);

        assert_eq!(im.read_word(0), 0x78563412);
    }

    #[test]
    fn check_write_word() {
        let mut im = InternalMemory::default();
        im.write_word(0, 0x12345678);

        assert_eq!(im.bios_system_rom[0], 0x78);
        assert_eq!(im.bios_system_rom[1], 0x56);
        assert_eq!(im.bios_system_rom[2], 0x34);
        assert_eq!(im.bios_system_rom[3], 0x12);
    }

    #[test]
    fn check_half_word_roundtrip() {
        let mut im = InternalMemory::default();
        im.write_half_word(0x02000000, 0x1234);

        assert_eq!(im.read_half_word(0x02000000), 0x1234);
        assert_eq!(im.read_at(0x02000000), 0x34);
        assert_eq!(im.read_at(0x02000001), 0x12);
    }

    #[test]
    fn misaligned_word_access_is_plain_little_endian() {
        let mut im = InternalMemory::default();
        im.write_word(0x02000001, 0xAABBCCDD);

        assert_eq!(im.read_word(0x02000001), 0xAABBCCDD);
        assert_eq!(im.read_at(0x02000001), 0xDD);
        assert_eq!(im.read_at(0x02000004), 0xAA);
    }

    #[test]
    fn word_roundtrip_across_widths() {
        let mut im = InternalMemory::default();
        im.write_word(0x03000010, 0x0102_0304);

        assert_eq!(im.read_half_word(0x03000010), 0x0304);
        assert_eq!(im.read_half_word(0x03000012), 0x0102);
        assert_eq!(im.read_at(0x03000013), 0x01);
    }
}
