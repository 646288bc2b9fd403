//! Register-based bytecode instruction definitions.
//!
//! All instructions are 32 bits wide for cache efficiency and predictable decoding.
//!
//! # Instruction Format
//!
//! ```text
//! ┌─────────┬─────────┬─────────┬─────────┐
//! │ opcode  │   dst   │  src1   │  src2   │
//! │ (8 bit) │ (8 bit) │ (8 bit) │ (8 bit) │
//! └─────────┴─────────┴─────────┴─────────┘
//! ```
//!
//! - `opcode`: Operation to perform
//! - `dst`: Destination register (or the tested/stored register)
//! - `src1`: First source register, or a pool index for calls
//! - `src2`: Second source register, or an argument count for calls
//!
//! Calls pass their arguments in the registers directly after `dst`:
//! `CallNative r4, @1, 2` calls native name #1 with `r5, r6` and writes the
//! result back into `r4`.

use std::fmt;

/// A register index (0-255).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Register(pub u8);

impl Register {
    /// Create a new register with the given index.
    #[inline]
    pub const fn new(index: u8) -> Self {
        Register(index)
    }

    /// Get the register index.
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// The register `n` slots after this one.
    #[inline]
    pub const fn offset(self, n: u8) -> Self {
        Register(self.0.wrapping_add(n))
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A 32-bit bytecode instruction.
///
/// The instruction is stored as a packed 32-bit value. All fields are
/// accessed through methods that extract the relevant bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Instruction(u32);

impl Instruction {
    /// Create an instruction from raw opcode and operands.
    #[inline]
    pub const fn new(opcode: Opcode, dst: u8, src1: u8, src2: u8) -> Self {
        Instruction(
            ((opcode as u32) << 24) | ((dst as u32) << 16) | ((src1 as u32) << 8) | (src2 as u32),
        )
    }

    /// Create an instruction with only an opcode (no operands).
    #[inline]
    pub const fn op(opcode: Opcode) -> Self {
        Self::new(opcode, 0, 0, 0)
    }

    /// Create an instruction with opcode and destination register.
    #[inline]
    pub const fn op_d(opcode: Opcode, dst: Register) -> Self {
        Self::new(opcode, dst.0, 0, 0)
    }

    /// Create an instruction with opcode, destination, and one source.
    #[inline]
    pub const fn op_ds(opcode: Opcode, dst: Register, src: Register) -> Self {
        Self::new(opcode, dst.0, src.0, 0)
    }

    /// Create an instruction with opcode, destination, and two sources.
    #[inline]
    pub const fn op_dss(opcode: Opcode, dst: Register, src1: Register, src2: Register) -> Self {
        Self::new(opcode, dst.0, src1.0, src2.0)
    }

    /// Create an instruction with a 16-bit immediate in src1:src2.
    #[inline]
    pub const fn op_di(opcode: Opcode, dst: Register, imm16: u16) -> Self {
        Self::new(opcode, dst.0, (imm16 >> 8) as u8, imm16 as u8)
    }

    /// Get the opcode.
    #[inline]
    pub const fn opcode(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Get the destination register index.
    #[inline]
    pub const fn dst(self) -> Register {
        Register(((self.0 >> 16) & 0xFF) as u8)
    }

    /// Get the first source register index.
    #[inline]
    pub const fn src1(self) -> Register {
        Register(((self.0 >> 8) & 0xFF) as u8)
    }

    /// Get the second source register index.
    #[inline]
    pub const fn src2(self) -> Register {
        Register((self.0 & 0xFF) as u8)
    }

    /// Get a 16-bit immediate from src1:src2.
    #[inline]
    pub const fn imm16(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Get the raw 32-bit value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from raw 32-bit value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Instruction(raw)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instruction({:02x}, {}, {}, {})",
            self.opcode(),
            self.dst(),
            self.src1(),
            self.src2()
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(op) = Opcode::from_u8(self.opcode()) {
            write!(f, "{:?}", op)?;
            match op.format() {
                InstructionFormat::NoOp => {}
                InstructionFormat::Dst => write!(f, " {}", self.dst())?,
                InstructionFormat::DstSrc => write!(f, " {}, {}", self.dst(), self.src1())?,
                InstructionFormat::DstSrcSrc => {
                    write!(f, " {}, {}, {}", self.dst(), self.src1(), self.src2())?
                }
                InstructionFormat::DstImm16 => write!(f, " {}, #{}", self.dst(), self.imm16())?,
                InstructionFormat::Imm16 => write!(f, " #{}", self.imm16())?,
                InstructionFormat::CallSite => write!(
                    f,
                    " {}, @{}, {}",
                    self.dst(),
                    self.src1().0,
                    self.src2().0
                )?,
            }
            Ok(())
        } else {
            write!(f, "INVALID({:08x})", self.0)
        }
    }
}

/// Instruction format categories for disassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionFormat {
    /// No operands (e.g., Nop, ReturnNone).
    NoOp,
    /// Destination register only (e.g., LoadNone).
    Dst,
    /// Destination and source register (e.g., Move).
    DstSrc,
    /// Destination and two source registers (e.g., Add).
    DstSrcSrc,
    /// Destination and 16-bit immediate (e.g., LoadConst).
    DstImm16,
    /// 16-bit immediate only (e.g., Jump).
    Imm16,
    /// Destination, pool index, argument count.
    CallSite,
}

/// Bytecode opcodes.
///
/// Opcodes are organized by category:
/// - 0x00-0x0F: Control flow
/// - 0x10-0x1F: Load/Store
/// - 0x20-0x2F: Arithmetic and comparison
/// - 0x30-0x3F: Container operations
/// - 0x40-0x4F: Calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // =========================================================================
    // Control Flow (0x00-0x0F)
    // =========================================================================
    /// No operation.
    Nop = 0x00,
    /// Return value in register.
    Return = 0x01,
    /// Return None.
    ReturnNone = 0x02,
    /// Unconditional jump to an absolute instruction index.
    Jump = 0x03,
    /// Jump if register is falsy.
    JumpIfFalse = 0x04,
    /// Raise an exception whose message is the register's value.
    Raise = 0x05,

    // =========================================================================
    // Load/Store (0x10-0x1F)
    // =========================================================================
    /// dst = constants[imm16]
    LoadConst = 0x10,
    /// dst = None
    LoadNone = 0x11,
    /// dst = src
    Move = 0x12,

    // =========================================================================
    // Arithmetic & Comparison (0x20-0x2F)
    // =========================================================================
    /// dst = src1 + src2
    Add = 0x20,
    /// dst = src1 - src2
    Sub = 0x21,
    /// dst = src1 * src2
    Mul = 0x22,
    /// dst = src1 < src2
    Lt = 0x23,
    /// dst = src1 == src2
    Eq = 0x24,

    // =========================================================================
    // Containers (0x30-0x3F)
    // =========================================================================
    /// dst = {}
    NewDict = 0x30,
    /// dst = src1[src2]
    GetItem = 0x31,
    /// dst[src1] = src2
    SetItem = 0x32,

    // =========================================================================
    // Calls (0x40-0x4F)
    // =========================================================================
    /// dst = procedures[src1](dst+1 .. dst+1+src2)
    Call = 0x40,
    /// dst = natives[names[src1]](dst+1 .. dst+1+src2)
    CallNative = 0x41,
}

impl Opcode {
    /// Decode an opcode byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Opcode::Nop),
            0x01 => Some(Opcode::Return),
            0x02 => Some(Opcode::ReturnNone),
            0x03 => Some(Opcode::Jump),
            0x04 => Some(Opcode::JumpIfFalse),
            0x05 => Some(Opcode::Raise),
            0x10 => Some(Opcode::LoadConst),
            0x11 => Some(Opcode::LoadNone),
            0x12 => Some(Opcode::Move),
            0x20 => Some(Opcode::Add),
            0x21 => Some(Opcode::Sub),
            0x22 => Some(Opcode::Mul),
            0x23 => Some(Opcode::Lt),
            0x24 => Some(Opcode::Eq),
            0x30 => Some(Opcode::NewDict),
            0x31 => Some(Opcode::GetItem),
            0x32 => Some(Opcode::SetItem),
            0x40 => Some(Opcode::Call),
            0x41 => Some(Opcode::CallNative),
            _ => None,
        }
    }

    /// Operand layout, used for disassembly.
    pub const fn format(self) -> InstructionFormat {
        use InstructionFormat::*;
        use Opcode::*;

        match self {
            Nop | ReturnNone => NoOp,
            LoadNone | NewDict | Return | Raise => Dst,
            Move => DstSrc,
            Add | Sub | Mul | Lt | Eq | GetItem | SetItem => DstSrcSrc,
            LoadConst | JumpIfFalse => DstImm16,
            Jump => Imm16,
            Call | CallNative => CallSite,
        }
    }

    /// Returns true for instructions that can transfer control.
    pub const fn is_branch(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpIfFalse)
    }
}
