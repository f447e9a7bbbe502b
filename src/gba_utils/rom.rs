use nom::number::complete::le_u32;

use crate::{
    error::{ParseErr, RomError},
    gba_utils::addr::{AddrRom, Pointer},
};

/// The full cartridge image. All codec reads and writes go through the checked
/// accessors here; offsets are plain [`AddrRom`] byte offsets.
pub struct Rom(Vec<u8>);

impl Rom {
    pub fn new(data: Vec<u8>) -> Result<Self, RomError> {
        if data.is_empty() {
            Err(RomError::Empty)
        } else if data.len() % 4 != 0 {
            Err(RomError::Size(data.len()))
        } else {
            Ok(Self(data))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn slice_at(&self, addr: AddrRom, size: usize) -> Result<&[u8], RomError> {
        self.0.get(addr.0..addr.0 + size).ok_or(RomError::Slice { addr, size, rom_len: self.0.len() })
    }

    pub fn slice_from(&self, addr: AddrRom) -> Result<&[u8], RomError> {
        self.0.get(addr.0..).ok_or(RomError::Slice { addr, size: 0, rom_len: self.0.len() })
    }

    /// Runs a nom parser over the ROM tail starting at `addr`.
    pub fn parse_at<'r, Ret, Parser>(&'r self, addr: AddrRom, mut f: Parser) -> Result<Ret, RomError>
    where
        Parser: nom::Parser<&'r [u8], Ret, nom::error::Error<&'r [u8]>>,
    {
        let bytes = self.slice_from(addr)?;
        let (_, ret) = f.parse(bytes).map_err(|_: ParseErr| RomError::Parse(addr))?;
        Ok(ret)
    }

    /// Reads a bus pointer word; null pointers are surfaced as an error since
    /// every table this crate follows treats them as "no entry".
    pub fn read_pointer_at(&self, addr: AddrRom) -> Result<Pointer, RomError> {
        let ptr = Pointer::new(self.parse_at(addr, le_u32)?);
        if ptr.is_null() {
            Err(RomError::NullPointer(addr))
        } else {
            Ok(ptr)
        }
    }

    /// Writes bytes at `addr`, growing the image with zero padding when the
    /// write lands past the current end (expanded-ROM exports).
    pub fn write_at(&mut self, addr: AddrRom, bytes: &[u8]) -> Result<(), RomError> {
        let end = addr.0 + bytes.len();
        if end > self.0.len() {
            let grown = (end + 3) & !3;
            self.0.resize(grown, 0);
        }
        self.0[addr.0..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_u16_at(&mut self, addr: AddrRom, value: u16) -> Result<(), RomError> {
        self.write_at(addr, &value.to_le_bytes())
    }

    pub fn write_u32_at(&mut self, addr: AddrRom, value: u32) -> Result<(), RomError> {
        self.write_at(addr, &value.to_le_bytes())
    }

    pub fn write_pointer_at(&mut self, addr: AddrRom, ptr: Pointer) -> Result<(), RomError> {
        self.write_u32_at(addr, ptr.raw())
    }
}

// -------------------------------------------------------------------------------------------------
