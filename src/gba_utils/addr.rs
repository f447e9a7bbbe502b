use std::{fmt, ops::{Add, AddAssign, BitAnd, BitAndAssign, Mul, MulAssign, Rem, RemAssign, Sub, SubAssign}};

use paste::paste;
use serde::{Deserialize, Serialize};

/// Only the low 24 bits of a GBA ROM pointer select a byte; the high byte is
/// the cartridge bus base.
pub const POINTER_BASE: u32 = 0x0800_0000;
pub const OFFSET_MASK: u32 = 0x00FF_FFFF;

macro_rules! gen_address_bin_op {
    ($name:ident, $op_name:ident, $op:tt) => {
        paste! {
            impl $op_name<$name> for $name {
                type Output = Self;
                fn [<$op_name:lower>](self, rhs: Self) -> Self::Output { Self(self.0 $op rhs.0) }
            }
            impl $op_name<usize> for $name {
                type Output = Self;
                fn [<$op_name:lower>](self, rhs: usize) -> Self::Output { Self(self.0 $op rhs) }
            }
            impl [<$op_name Assign>]<$name> for $name {
                fn [<$op_name:lower _assign>](&mut self, rhs: Self) { self.0 = self.0 $op rhs.0; }
            }
            impl [<$op_name Assign>]<usize> for $name {
                fn [<$op_name:lower _assign>](&mut self, rhs: usize) { self.0 = self.0 $op rhs; }
            }
        }
    };
}

/// Byte offset into the ROM image, i.e. a bus pointer with the base stripped.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct AddrRom(pub usize);

gen_address_bin_op!(AddrRom, Add,    +);
gen_address_bin_op!(AddrRom, Sub,    -);
gen_address_bin_op!(AddrRom, Mul,    *);
gen_address_bin_op!(AddrRom, Rem,    %);
gen_address_bin_op!(AddrRom, BitAnd, &);

impl AddrRom {
    #[must_use]
    pub fn align4(self) -> Self {
        Self((self.0 + 3) & !3)
    }

    pub fn is_aligned4(self) -> bool {
        self.0 % 4 == 0
    }
}

impl From<usize> for AddrRom {
    fn from(addr: usize) -> Self {
        Self(addr)
    }
}

impl From<u32> for AddrRom {
    fn from(addr: u32) -> Self {
        Self(addr as usize)
    }
}

impl From<AddrRom> for usize {
    fn from(addr: AddrRom) -> usize {
        addr.0
    }
}

impl fmt::LowerHex for AddrRom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ROM {:#x}", self.0)
    }
}

impl fmt::UpperHex for AddrRom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ROM {:#X}", self.0)
    }
}

impl fmt::Display for AddrRom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06x}", self.0)
    }
}

impl fmt::Debug for AddrRom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AddrRom(0x{:06x})", self.0)
    }
}

// -------------------------------------------------------------------------------------------------

/// A raw GBA bus pointer as stored in the ROM: `(offset & 0xFFFFFF) | 0x08000000`.
///
/// The all-zero word is the conventional null value and never a valid pointer.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Pointer(u32);

impl Pointer {
    pub const NULL: Pointer = Pointer(0);

    pub fn new(raw: u32) -> Self {
        if raw == 0 {
            Self::NULL
        } else {
            Self((raw & OFFSET_MASK) | POINTER_BASE)
        }
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn address(self) -> AddrRom {
        AddrRom((self.0 & OFFSET_MASK) as usize)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<AddrRom> for Pointer {
    fn from(addr: AddrRom) -> Self {
        Self::new(addr.0 as u32)
    }
}

impl fmt::LowerHex for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:08x}", self.0)
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer(${:08x})", self.0)
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_sets_bus_base() {
        let p = Pointer::new(0x25_8000);
        assert_eq!(p.raw(), 0x0825_8000);
        assert_eq!(p.address(), AddrRom(0x25_8000));
    }

    #[test]
    fn pointer_masks_high_byte() {
        assert_eq!(Pointer::new(0x0825_8000).address(), AddrRom(0x25_8000));
    }

    #[test]
    fn null_pointer_stays_null() {
        assert!(Pointer::new(0).is_null());
        assert!(!Pointer::new(4).is_null());
    }

    #[test]
    fn align4_rounds_up() {
        assert_eq!(AddrRom(0x101).align4(), AddrRom(0x104));
        assert_eq!(AddrRom(0x104).align4(), AddrRom(0x104));
    }
}
