//! Facilities for disassembling Z80 machine code.

use crate::bus::{BusPeeker, SimBus};
use std::fmt;

//===========================================================================//

/// A condition under which a conditional Z80 operation will be executed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Condition {
    /// Always execute the operation.
    Always,
    /// Execute the operation if the zero flag is not set.
    Nz,
    /// Execute the operation if the zero flag is set.
    Z,
    /// Execute the operation if the carry flag is not set.
    Nc,
    /// Execute the operation if the carry flag is set.
    C,
    /// Execute the operation if the parity/overflow flag is not set.
    Po,
    /// Execute the operation if the parity/overflow flag is set.
    Pe,
    /// Execute the operation if the sign flag is not set.
    P,
    /// Execute the operation if the sign flag is set.
    M,
}

impl Condition {
    fn from_index(index: u8) -> Condition {
        match index & 0x7 {
            0 => Condition::Nz,
            1 => Condition::Z,
            2 => Condition::Nc,
            3 => Condition::C,
            4 => Condition::Po,
            5 => Condition::Pe,
            6 => Condition::P,
            _ => Condition::M,
        }
    }

    fn format(self) -> &'static str {
        match self {
            Condition::Always => "",
            Condition::Nz => "NZ",
            Condition::Z => "Z",
            Condition::Nc => "NC",
            Condition::C => "C",
            Condition::Po => "PO",
            Condition::Pe => "PE",
            Condition::P => "P",
            Condition::M => "M",
        }
    }
}

//===========================================================================//

/// An 8-bit register for a Z80 processor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Reg8 {
    /// The A register.
    A,
    /// The B register.
    B,
    /// The C register.
    C,
    /// The D register.
    D,
    /// The E register.
    E,
    /// The H register.
    H,
    /// The L register.
    L,
    /// The memory location pointed to by the combined BC register.
    Mbc,
    /// The memory location pointed to by the combined DE register.
    Mde,
    /// The memory location pointed to by the combined HL register.
    Mhl,
}

impl Reg8 {
    /// Decodes a 3-bit register field, as used by most of the opcode space.
    fn from_index(index: u8) -> Reg8 {
        match index & 0x7 {
            0 => Reg8::B,
            1 => Reg8::C,
            2 => Reg8::D,
            3 => Reg8::E,
            4 => Reg8::H,
            5 => Reg8::L,
            6 => Reg8::Mhl,
            _ => Reg8::A,
        }
    }
}

impl fmt::Display for Reg8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Reg8::A => "A",
            Reg8::B => "B",
            Reg8::C => "C",
            Reg8::D => "D",
            Reg8::E => "E",
            Reg8::H => "H",
            Reg8::L => "L",
            Reg8::Mbc => "(BC)",
            Reg8::Mde => "(DE)",
            Reg8::Mhl => "(HL)",
        })
    }
}

//===========================================================================//

/// A 16-bit register for a Z80 processor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Reg16 {
    /// The combined AF register.
    Af,
    /// The combined BC register.
    Bc,
    /// The combined DE register.
    De,
    /// The combined HL register.
    Hl,
    /// The stack pointer.
    Sp,
}

impl Reg16 {
    /// Decodes a 2-bit register pair field, where 3 means SP.
    fn from_pair(index: u8) -> Reg16 {
        match index & 0x3 {
            0 => Reg16::Bc,
            1 => Reg16::De,
            2 => Reg16::Hl,
            _ => Reg16::Sp,
        }
    }

    /// Decodes a 2-bit register pair field for `PUSH`/`POP`, where 3 means
    /// AF.
    fn from_pair_af(index: u8) -> Reg16 {
        match index & 0x3 {
            0 => Reg16::Bc,
            1 => Reg16::De,
            2 => Reg16::Hl,
            _ => Reg16::Af,
        }
    }
}

impl fmt::Display for Reg16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Reg16::Af => "AF",
            Reg16::Bc => "BC",
            Reg16::De => "DE",
            Reg16::Hl => "HL",
            Reg16::Sp => "SP",
        })
    }
}

//===========================================================================//

/// One of the two index registers, selected by a `DD` or `FD` prefix.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Index {
    /// The IX register (`DD` prefix).
    Ix,
    /// The IY register (`FD` prefix).
    Iy,
}

impl Index {
    /// Returns the index register selected by the given prefix byte.  Any
    /// byte other than `$DD` selects IY.
    pub fn from_prefix(prefix: u8) -> Index {
        if prefix == 0xdd { Index::Ix } else { Index::Iy }
    }

    /// Returns the prefix byte that selects this index register.
    pub fn prefix(self) -> u8 {
        match self {
            Index::Ix => 0xdd,
            Index::Iy => 0xfd,
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Index::Ix => "IX",
            Index::Iy => "IY",
        })
    }
}

/// One 8-bit half of an index register.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Half {
    /// The high byte (IXH or IYH).
    Hi,
    /// The low byte (IXL or IYL).
    Lo,
}

impl Half {
    fn name(self, index: Index) -> &'static str {
        match (index, self) {
            (Index::Ix, Half::Hi) => "IXH",
            (Index::Ix, Half::Lo) => "IXL",
            (Index::Iy, Half::Hi) => "IYH",
            (Index::Iy, Half::Lo) => "IYL",
        }
    }
}

//===========================================================================//

/// An 8-bit arithmetic/logic operation on the A register.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Alu {
    /// Add to A.
    Add,
    /// Add to A with carry.
    Adc,
    /// Subtract from A.
    Sub,
    /// Subtract from A with carry.
    Sbc,
    /// Bitwise-AND into A.
    And,
    /// Bitwise-XOR into A.
    Xor,
    /// Bitwise-OR into A.
    Or,
    /// Compare with A.
    Cp,
}

impl Alu {
    fn from_index(index: u8) -> Alu {
        match index & 0x7 {
            0 => Alu::Add,
            1 => Alu::Adc,
            2 => Alu::Sub,
            3 => Alu::Sbc,
            4 => Alu::And,
            5 => Alu::Xor,
            6 => Alu::Or,
            _ => Alu::Cp,
        }
    }

    // ADD, ADC and SBC name the accumulator explicitly; the others don't.
    fn format(self, operand: impl fmt::Display) -> String {
        match self {
            Alu::Add => format!("ADD A,{operand}"),
            Alu::Adc => format!("ADC A,{operand}"),
            Alu::Sub => format!("SUB {operand}"),
            Alu::Sbc => format!("SBC A,{operand}"),
            Alu::And => format!("AND {operand}"),
            Alu::Xor => format!("XOR {operand}"),
            Alu::Or => format!("OR {operand}"),
            Alu::Cp => format!("CP {operand}"),
        }
    }
}

//===========================================================================//

/// An operation from the unprefixed Z80 opcode space.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Unprefixed {
    /// Apply an ALU operation to A and an 8-bit immediate value.
    AluI8(Alu),
    /// Apply an ALU operation to A and an 8-bit register.
    AluR8(Alu, Reg8),
    /// Add a 16-bit register to the HL register.
    AddHlR16(Reg16),
    /// Call subroutine at an immediate 16-bit address.
    CallM16(Condition),
    /// Complement the carry flag.
    Ccf,
    /// Complement the A register.
    Cpl,
    /// Decimal adjust accumulator.
    Daa,
    /// Decrement a 16-bit register.
    DecR16(Reg16),
    /// Decrement an 8-bit register.
    DecR8(Reg8),
    /// Disable interrupts.
    Di,
    /// Decrement B and jump relative if it is not zero.
    Djnz,
    /// Enable interrupts.
    Ei,
    /// Exchange AF with its shadow register.
    ExAfAf,
    /// Exchange DE with HL.
    ExDeHl,
    /// Exchange HL with the top of the stack.
    ExSpHl,
    /// Exchange BC, DE and HL with their shadow registers.
    Exx,
    /// Pause execution until the next interrupt.
    Halt,
    /// Read from the I/O port at an 8-bit immediate address into A.
    InAM8,
    /// Increment a 16-bit register.
    IncR16(Reg16),
    /// Increment an 8-bit register.
    IncR8(Reg8),
    /// A prefix byte, which cannot be decoded on its own.
    Invalid(u8),
    /// Jump to the address held in the HL register.
    JpHl,
    /// Jump to the 16-bit immediate address.
    JpI16(Condition),
    /// Jump relative by a signed 8-bit immediate offset.
    Jr(Condition),
    /// Load from memory at a 16-bit immediate address into A.
    LdAM16,
    /// Load from memory at a 16-bit immediate address into HL.
    LdHlM16,
    /// Load A into memory at a 16-bit immediate address.
    LdM16A,
    /// Load HL into memory at a 16-bit immediate address.
    LdM16Hl,
    /// Load a 16-bit immediate value into a 16-bit register.
    LdR16I16(Reg16),
    /// Load an 8-bit immediate value into an 8-bit register.
    LdR8I8(Reg8),
    /// Load one 8-bit register into another.
    LdR8R8(Reg8, Reg8),
    /// Load HL into the stack pointer.
    LdSpHl,
    /// No-op.
    Nop,
    /// Write A to the I/O port at an 8-bit immediate address.
    OutM8A,
    /// Pop a 16-bit register from the stack.
    Pop(Reg16),
    /// Push a 16-bit register onto the stack.
    Push(Reg16),
    /// Return from subroutine.
    Ret(Condition),
    /// Rotate A left, through the carry flag (9-bit rotate).
    Rla,
    /// Rotate A left (8-bit rotate).
    Rlca,
    /// Rotate A right, through the carry flag (9-bit rotate).
    Rra,
    /// Rotate A right (8-bit rotate).
    Rrca,
    /// Call subroutine at the specified restart address.
    Rst(u8),
    /// Set the carry flag.
    Scf,
}

impl Unprefixed {
    /// Decodes an unprefixed Z80 opcode.  The four prefix bytes (`$CB`,
    /// `$DD`, `$ED`, `$FD`) decode as [`Unprefixed::Invalid`].
    pub fn from_opcode(opcode: u8) -> Unprefixed {
        let (x, y, z) = (opcode >> 6, (opcode >> 3) & 0x7, opcode & 0x7);
        let (p, q) = (y >> 1, y & 0x1);
        match (x, z) {
            (0, 0) => match y {
                0 => Unprefixed::Nop,
                1 => Unprefixed::ExAfAf,
                2 => Unprefixed::Djnz,
                3 => Unprefixed::Jr(Condition::Always),
                _ => Unprefixed::Jr(Condition::from_index(y - 4)),
            },
            (0, 1) if q == 0 => Unprefixed::LdR16I16(Reg16::from_pair(p)),
            (0, 1) => Unprefixed::AddHlR16(Reg16::from_pair(p)),
            (0, 2) => match (q, p) {
                (0, 0) => Unprefixed::LdR8R8(Reg8::Mbc, Reg8::A),
                (0, 1) => Unprefixed::LdR8R8(Reg8::Mde, Reg8::A),
                (0, 2) => Unprefixed::LdM16Hl,
                (0, _) => Unprefixed::LdM16A,
                (_, 0) => Unprefixed::LdR8R8(Reg8::A, Reg8::Mbc),
                (_, 1) => Unprefixed::LdR8R8(Reg8::A, Reg8::Mde),
                (_, 2) => Unprefixed::LdHlM16,
                (_, _) => Unprefixed::LdAM16,
            },
            (0, 3) if q == 0 => Unprefixed::IncR16(Reg16::from_pair(p)),
            (0, 3) => Unprefixed::DecR16(Reg16::from_pair(p)),
            (0, 4) => Unprefixed::IncR8(Reg8::from_index(y)),
            (0, 5) => Unprefixed::DecR8(Reg8::from_index(y)),
            (0, 6) => Unprefixed::LdR8I8(Reg8::from_index(y)),
            (0, _) => match y {
                0 => Unprefixed::Rlca,
                1 => Unprefixed::Rrca,
                2 => Unprefixed::Rla,
                3 => Unprefixed::Rra,
                4 => Unprefixed::Daa,
                5 => Unprefixed::Cpl,
                6 => Unprefixed::Scf,
                _ => Unprefixed::Ccf,
            },
            (1, 6) if y == 6 => Unprefixed::Halt,
            (1, _) => {
                Unprefixed::LdR8R8(Reg8::from_index(y), Reg8::from_index(z))
            }
            (2, _) => {
                Unprefixed::AluR8(Alu::from_index(y), Reg8::from_index(z))
            }
            (_, 0) => Unprefixed::Ret(Condition::from_index(y)),
            (_, 1) if q == 0 => Unprefixed::Pop(Reg16::from_pair_af(p)),
            (_, 1) => match p {
                0 => Unprefixed::Ret(Condition::Always),
                1 => Unprefixed::Exx,
                2 => Unprefixed::JpHl,
                _ => Unprefixed::LdSpHl,
            },
            (_, 2) => Unprefixed::JpI16(Condition::from_index(y)),
            (_, 3) => match y {
                0 => Unprefixed::JpI16(Condition::Always),
                2 => Unprefixed::OutM8A,
                3 => Unprefixed::InAM8,
                4 => Unprefixed::ExSpHl,
                5 => Unprefixed::ExDeHl,
                6 => Unprefixed::Di,
                7 => Unprefixed::Ei,
                _ => Unprefixed::Invalid(opcode),
            },
            (_, 4) => Unprefixed::CallM16(Condition::from_index(y)),
            (_, 5) if q == 0 => Unprefixed::Push(Reg16::from_pair_af(p)),
            (_, 5) if p == 0 => Unprefixed::CallM16(Condition::Always),
            (_, 5) => Unprefixed::Invalid(opcode),
            (_, 6) => Unprefixed::AluI8(Alu::from_index(y)),
            (_, _) => Unprefixed::Rst(y * 8),
        }
    }

    fn read_operand(self, peeker: &mut BusPeeker<'_>) -> Operand {
        match self {
            Unprefixed::Djnz | Unprefixed::Jr(_) => {
                Operand::I8(peeker.next_i8())
            }
            Unprefixed::AluI8(_)
            | Unprefixed::InAM8
            | Unprefixed::LdR8I8(_)
            | Unprefixed::OutM8A => Operand::U8(peeker.next_u8()),
            Unprefixed::CallM16(_)
            | Unprefixed::JpI16(_)
            | Unprefixed::LdAM16
            | Unprefixed::LdHlM16
            | Unprefixed::LdM16A
            | Unprefixed::LdM16Hl
            | Unprefixed::LdR16I16(_) => Operand::U16(peeker.next_u16()),
            _ => Operand::None,
        }
    }

    fn format(self, operand: Operand, addr: u16) -> String {
        match self {
            Unprefixed::AluI8(alu) => alu.format(format_u8(operand)),
            Unprefixed::AluR8(alu, reg) => alu.format(reg),
            Unprefixed::AddHlR16(reg) => format!("ADD HL,{reg}"),
            Unprefixed::CallM16(Condition::Always) => {
                format!("CALL {}", format_u16(operand))
            }
            Unprefixed::CallM16(cond) => {
                format!("CALL {},{}", cond.format(), format_u16(operand))
            }
            Unprefixed::Ccf => "CCF".to_string(),
            Unprefixed::Cpl => "CPL".to_string(),
            Unprefixed::Daa => "DAA".to_string(),
            Unprefixed::DecR16(reg) => format!("DEC {reg}"),
            Unprefixed::DecR8(reg) => format!("DEC {reg}"),
            Unprefixed::Di => "DI".to_string(),
            Unprefixed::Djnz => {
                format!("DJNZ {}", format_relative(addr, operand))
            }
            Unprefixed::Ei => "EI".to_string(),
            Unprefixed::ExAfAf => "EX AF,AF'".to_string(),
            Unprefixed::ExDeHl => "EX DE,HL".to_string(),
            Unprefixed::ExSpHl => "EX (SP),HL".to_string(),
            Unprefixed::Exx => "EXX".to_string(),
            Unprefixed::Halt => "HALT".to_string(),
            Unprefixed::InAM8 => format!("IN A,({})", format_u8(operand)),
            Unprefixed::IncR16(reg) => format!("INC {reg}"),
            Unprefixed::IncR8(reg) => format!("INC {reg}"),
            Unprefixed::Invalid(opcode) => format!("DB ${opcode:02X}"),
            Unprefixed::JpHl => "JP (HL)".to_string(),
            Unprefixed::JpI16(Condition::Always) => {
                format!("JP {}", format_u16(operand))
            }
            Unprefixed::JpI16(cond) => {
                format!("JP {},{}", cond.format(), format_u16(operand))
            }
            Unprefixed::Jr(Condition::Always) => {
                format!("JR {}", format_relative(addr, operand))
            }
            Unprefixed::Jr(cond) => {
                let dest = format_relative(addr, operand);
                format!("JR {},{dest}", cond.format())
            }
            Unprefixed::LdAM16 => format!("LD A,({})", format_u16(operand)),
            Unprefixed::LdHlM16 => format!("LD HL,({})", format_u16(operand)),
            Unprefixed::LdM16A => format!("LD ({}),A", format_u16(operand)),
            Unprefixed::LdM16Hl => format!("LD ({}),HL", format_u16(operand)),
            Unprefixed::LdR16I16(reg) => {
                format!("LD {reg},{}", format_u16(operand))
            }
            Unprefixed::LdR8I8(reg) => {
                format!("LD {reg},{}", format_u8(operand))
            }
            Unprefixed::LdR8R8(r1, r2) => format!("LD {r1},{r2}"),
            Unprefixed::LdSpHl => "LD SP,HL".to_string(),
            Unprefixed::Nop => "NOP".to_string(),
            Unprefixed::OutM8A => format!("OUT ({}),A", format_u8(operand)),
            Unprefixed::Pop(reg) => format!("POP {reg}"),
            Unprefixed::Push(reg) => format!("PUSH {reg}"),
            Unprefixed::Ret(Condition::Always) => "RET".to_string(),
            Unprefixed::Ret(cond) => format!("RET {}", cond.format()),
            Unprefixed::Rla => "RLA".to_string(),
            Unprefixed::Rlca => "RLCA".to_string(),
            Unprefixed::Rra => "RRA".to_string(),
            Unprefixed::Rrca => "RRCA".to_string(),
            Unprefixed::Rst(zp) => format!("RST ${zp:02X}"),
            Unprefixed::Scf => "SCF".to_string(),
        }
    }
}

//===========================================================================//

/// A rotate or shift operation from the `CB`-prefixed opcode space.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Shift {
    /// Rotate left (8-bit rotate).
    Rlc,
    /// Rotate right (8-bit rotate).
    Rrc,
    /// Rotate left, through the carry flag (9-bit rotate).
    Rl,
    /// Rotate right, through the carry flag (9-bit rotate).
    Rr,
    /// Shift left arithmetically.
    Sla,
    /// Shift right arithmetically.
    Sra,
    /// Shift left, setting bit 0 (undocumented).
    Sll,
    /// Shift right logically.
    Srl,
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Shift::Rlc => "RLC",
            Shift::Rrc => "RRC",
            Shift::Rl => "RL",
            Shift::Rr => "RR",
            Shift::Sla => "SLA",
            Shift::Sra => "SRA",
            Shift::Sll => "SLL",
            Shift::Srl => "SRL",
        })
    }
}

/// A `CB`-prefixed (bit) operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Prefixed {
    /// Rotate or shift the register.
    Shift(Shift),
    /// Test one bit of the register.
    Bit(u8),
    /// Reset one bit of the register.
    Res(u8),
    /// Set one bit of the register.
    Set(u8),
}

impl Prefixed {
    /// Decodes the byte following a `CB` prefix.
    pub fn decode(byte: u8) -> (Prefixed, Reg8) {
        let (hi, mid, lo) = (byte >> 6, (byte >> 3) & 0x7, byte & 0x7);
        let prefixed = match hi {
            0 => Prefixed::Shift(match mid {
                0 => Shift::Rlc,
                1 => Shift::Rrc,
                2 => Shift::Rl,
                3 => Shift::Rr,
                4 => Shift::Sla,
                5 => Shift::Sra,
                6 => Shift::Sll,
                _ => Shift::Srl,
            }),
            1 => Prefixed::Bit(mid),
            2 => Prefixed::Res(mid),
            _ => Prefixed::Set(mid),
        };
        (prefixed, Reg8::from_index(lo))
    }

    /// Formats a `CB`-prefixed instruction as a human-readable string.
    pub fn format(self, reg: Reg8) -> String {
        match self {
            Prefixed::Shift(shift) => format!("{shift} {reg}"),
            Prefixed::Bit(bit) => format!("BIT {bit},{reg}"),
            Prefixed::Res(bit) => format!("RES {bit},{reg}"),
            Prefixed::Set(bit) => format!("SET {bit},{reg}"),
        }
    }

    /// Formats a `DD CB`/`FD CB` instruction as a human-readable string.
    /// Any register other than `(HL)` receives a copy of the result, except
    /// for `BIT`, which only tests.
    pub fn format_indexed(self, index: Index, disp: i8, reg: Reg8) -> String {
        let mem = format_indexed(index, disp);
        match (self, reg) {
            (Prefixed::Bit(bit), _) => format!("BIT {bit},{mem}"),
            (Prefixed::Shift(shift), Reg8::Mhl) => format!("{shift} {mem}"),
            (Prefixed::Shift(shift), _) => format!("{shift} {mem},{reg}"),
            (Prefixed::Res(bit), Reg8::Mhl) => format!("RES {bit},{mem}"),
            (Prefixed::Res(bit), _) => format!("RES {bit},{mem},{reg}"),
            (Prefixed::Set(bit), Reg8::Mhl) => format!("SET {bit},{mem}"),
            (Prefixed::Set(bit), _) => format!("SET {bit},{mem},{reg}"),
        }
    }
}

//===========================================================================//

/// An operation from the `ED`-prefixed opcode space.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Extended {
    /// Add a 16-bit register to HL with carry.
    AdcHlR16(Reg16),
    /// Compare and decrement.
    Cpd,
    /// Compare and decrement, repeated.
    Cpdr,
    /// Compare and increment.
    Cpi,
    /// Compare and increment, repeated.
    Cpir,
    /// Set the interrupt mode.
    Im(u8),
    /// Read from the I/O port at C, setting flags only.
    InF,
    /// Read from the I/O port at C into an 8-bit register.
    InR8(Reg8),
    /// Port input and decrement.
    Ind,
    /// Port input and decrement, repeated.
    Indr,
    /// Port input and increment.
    Ini,
    /// Port input and increment, repeated.
    Inir,
    /// An opcode with no defined meaning after `ED`.
    Invalid(u8),
    /// Load the I register into A.
    LdAI,
    /// Load the R register into A.
    LdAR,
    /// Load A into the I register.
    LdIA,
    /// Load a 16-bit register into memory at a 16-bit immediate address.
    LdM16R16(Reg16),
    /// Load from memory at a 16-bit immediate address into a 16-bit register.
    LdR16M16(Reg16),
    /// Load A into the R register.
    LdRA,
    /// Block load and decrement.
    Ldd,
    /// Block load and decrement, repeated.
    Lddr,
    /// Block load and increment.
    Ldi,
    /// Block load and increment, repeated.
    Ldir,
    /// Negate A.
    Neg,
    /// Port output and decrement, repeated.
    Otdr,
    /// Port output and increment, repeated.
    Otir,
    /// Write an 8-bit register to the I/O port at C.
    OutR8(Reg8),
    /// Write zero to the I/O port at C.
    OutZero,
    /// Port output and decrement.
    Outd,
    /// Port output and increment.
    Outi,
    /// Return from interrupt.
    Reti,
    /// Return from non-maskable interrupt.
    Retn,
    /// Rotate BCD digit left between A and (HL).
    Rld,
    /// Rotate BCD digit right between A and (HL).
    Rrd,
    /// Subtract a 16-bit register from HL with carry.
    SbcHlR16(Reg16),
}

impl Extended {
    /// Decodes the byte following an `ED` prefix.
    pub fn from_opcode(opcode: u8) -> Extended {
        match opcode {
            0x40 => Extended::InR8(Reg8::B),
            0x41 => Extended::OutR8(Reg8::B),
            0x42 => Extended::SbcHlR16(Reg16::Bc),
            0x43 => Extended::LdM16R16(Reg16::Bc),
            0x44 => Extended::Neg,
            0x45 => Extended::Retn,
            0x46 => Extended::Im(0),
            0x47 => Extended::LdIA,
            0x48 => Extended::InR8(Reg8::C),
            0x49 => Extended::OutR8(Reg8::C),
            0x4a => Extended::AdcHlR16(Reg16::Bc),
            0x4b => Extended::LdR16M16(Reg16::Bc),
            0x4d => Extended::Reti,
            0x4f => Extended::LdRA,

            0x50 => Extended::InR8(Reg8::D),
            0x51 => Extended::OutR8(Reg8::D),
            0x52 => Extended::SbcHlR16(Reg16::De),
            0x53 => Extended::LdM16R16(Reg16::De),
            0x56 => Extended::Im(1),
            0x57 => Extended::LdAI,
            0x58 => Extended::InR8(Reg8::E),
            0x59 => Extended::OutR8(Reg8::E),
            0x5a => Extended::AdcHlR16(Reg16::De),
            0x5b => Extended::LdR16M16(Reg16::De),
            0x5e => Extended::Im(2),
            0x5f => Extended::LdAR,

            0x60 => Extended::InR8(Reg8::H),
            0x61 => Extended::OutR8(Reg8::H),
            0x62 => Extended::SbcHlR16(Reg16::Hl),
            0x63 => Extended::LdM16R16(Reg16::Hl),
            0x67 => Extended::Rrd,
            0x68 => Extended::InR8(Reg8::L),
            0x69 => Extended::OutR8(Reg8::L),
            0x6a => Extended::AdcHlR16(Reg16::Hl),
            0x6b => Extended::LdR16M16(Reg16::Hl),
            0x6f => Extended::Rld,

            0x70 => Extended::InF,
            0x71 => Extended::OutZero,
            0x72 => Extended::SbcHlR16(Reg16::Sp),
            0x73 => Extended::LdM16R16(Reg16::Sp),
            0x78 => Extended::InR8(Reg8::A),
            0x79 => Extended::OutR8(Reg8::A),
            0x7a => Extended::AdcHlR16(Reg16::Sp),
            0x7b => Extended::LdR16M16(Reg16::Sp),

            0xa0 => Extended::Ldi,
            0xa1 => Extended::Cpi,
            0xa2 => Extended::Ini,
            0xa3 => Extended::Outi,
            0xa8 => Extended::Ldd,
            0xa9 => Extended::Cpd,
            0xaa => Extended::Ind,
            0xab => Extended::Outd,

            0xb0 => Extended::Ldir,
            0xb1 => Extended::Cpir,
            0xb2 => Extended::Inir,
            0xb3 => Extended::Otir,
            0xb8 => Extended::Lddr,
            0xb9 => Extended::Cpdr,
            0xba => Extended::Indr,
            0xbb => Extended::Otdr,

            _ => Extended::Invalid(opcode),
        }
    }

    fn read_operand(self, peeker: &mut BusPeeker<'_>) -> Operand {
        match self {
            Extended::LdM16R16(_) | Extended::LdR16M16(_) => {
                Operand::U16(peeker.next_u16())
            }
            _ => Operand::None,
        }
    }

    fn format(self, operand: Operand) -> String {
        match self {
            Extended::AdcHlR16(reg) => format!("ADC HL,{reg}"),
            Extended::Cpd => "CPD".to_string(),
            Extended::Cpdr => "CPDR".to_string(),
            Extended::Cpi => "CPI".to_string(),
            Extended::Cpir => "CPIR".to_string(),
            Extended::Im(mode) => format!("IM {mode}"),
            Extended::InF => "IN (C)".to_string(),
            Extended::InR8(reg) => format!("IN {reg},(C)"),
            Extended::Ind => "IND".to_string(),
            Extended::Indr => "INDR".to_string(),
            Extended::Ini => "INI".to_string(),
            Extended::Inir => "INIR".to_string(),
            Extended::Invalid(opcode) => format!("DB $ED,${opcode:02X}"),
            Extended::LdAI => "LD A,I".to_string(),
            Extended::LdAR => "LD A,R".to_string(),
            Extended::LdIA => "LD I,A".to_string(),
            Extended::LdM16R16(reg) => {
                format!("LD ({}),{reg}", format_u16(operand))
            }
            Extended::LdR16M16(reg) => {
                format!("LD {reg},({})", format_u16(operand))
            }
            Extended::LdRA => "LD R,A".to_string(),
            Extended::Ldd => "LDD".to_string(),
            Extended::Lddr => "LDDR".to_string(),
            Extended::Ldi => "LDI".to_string(),
            Extended::Ldir => "LDIR".to_string(),
            Extended::Neg => "NEG".to_string(),
            Extended::Otdr => "OTDR".to_string(),
            Extended::Otir => "OTIR".to_string(),
            Extended::OutR8(reg) => format!("OUT (C),{reg}"),
            Extended::OutZero => "OUT (C),0".to_string(),
            Extended::Outd => "OUTD".to_string(),
            Extended::Outi => "OUTI".to_string(),
            Extended::Reti => "RETI".to_string(),
            Extended::Retn => "RETN".to_string(),
            Extended::Rld => "RLD".to_string(),
            Extended::Rrd => "RRD".to_string(),
            Extended::SbcHlR16(reg) => format!("SBC HL,{reg}"),
        }
    }
}

//===========================================================================//

/// An operation from the `DD`/`FD`-prefixed opcode space.  The index register
/// itself is carried separately (see [`Operation::Indexed`]); "Md" in a
/// variant name means the memory location at the index register plus a
/// signed displacement, e.g. `(IX+5)`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Indexed {
    /// Add a 16-bit register to the index register (HL stands for the index
    /// register itself).
    AddR16(Reg16),
    /// Apply an ALU operation to A and half of the index register.
    AluHalf(Alu, Half),
    /// Apply an ALU operation to A and an indexed memory location.
    AluMd(Alu),
    /// Decrement half of the index register.
    DecHalf(Half),
    /// Decrement the index register.
    DecIdx,
    /// Decrement an indexed memory location.
    DecMd,
    /// Exchange the index register with the top of the stack.
    ExSpIdx,
    /// Increment half of the index register.
    IncHalf(Half),
    /// Increment the index register.
    IncIdx,
    /// Increment an indexed memory location.
    IncMd,
    /// An opcode that is not affected by the index prefix.
    Invalid(u8),
    /// Jump to the address held in the index register.
    JpIdx,
    /// Load one half of the index register into another.
    LdHalfHalf(Half, Half),
    /// Load an 8-bit immediate value into half of the index register.
    LdHalfI8(Half),
    /// Load an 8-bit register into half of the index register.
    LdHalfR8(Half, Reg8),
    /// Load a 16-bit immediate value into the index register.
    LdIdxI16,
    /// Load from memory at a 16-bit immediate address into the index
    /// register.
    LdIdxM16,
    /// Load the index register into memory at a 16-bit immediate address.
    LdM16Idx,
    /// Load an 8-bit immediate value into an indexed memory location.
    LdMdI8,
    /// Load an 8-bit register into an indexed memory location.
    LdMdR8(Reg8),
    /// Load half of the index register into an 8-bit register.
    LdR8Half(Reg8, Half),
    /// Load from an indexed memory location into an 8-bit register.
    LdR8Md(Reg8),
    /// Load the index register into the stack pointer.
    LdSpIdx,
    /// Pop the index register from the stack.
    PopIdx,
    /// Push the index register onto the stack.
    PushIdx,
}

impl Indexed {
    /// Decodes the byte following a `DD` or `FD` prefix (other than `CB`).
    pub fn from_opcode(opcode: u8) -> Indexed {
        match opcode {
            0x09 => Indexed::AddR16(Reg16::Bc),
            0x19 => Indexed::AddR16(Reg16::De),
            0x21 => Indexed::LdIdxI16,
            0x22 => Indexed::LdM16Idx,
            0x23 => Indexed::IncIdx,
            0x24 => Indexed::IncHalf(Half::Hi),
            0x25 => Indexed::DecHalf(Half::Hi),
            0x26 => Indexed::LdHalfI8(Half::Hi),
            0x29 => Indexed::AddR16(Reg16::Hl),
            0x2a => Indexed::LdIdxM16,
            0x2b => Indexed::DecIdx,
            0x2c => Indexed::IncHalf(Half::Lo),
            0x2d => Indexed::DecHalf(Half::Lo),
            0x2e => Indexed::LdHalfI8(Half::Lo),
            0x34 => Indexed::IncMd,
            0x35 => Indexed::DecMd,
            0x36 => Indexed::LdMdI8,
            0x39 => Indexed::AddR16(Reg16::Sp),

            0x44 => Indexed::LdR8Half(Reg8::B, Half::Hi),
            0x45 => Indexed::LdR8Half(Reg8::B, Half::Lo),
            0x46 => Indexed::LdR8Md(Reg8::B),
            0x4c => Indexed::LdR8Half(Reg8::C, Half::Hi),
            0x4d => Indexed::LdR8Half(Reg8::C, Half::Lo),
            0x4e => Indexed::LdR8Md(Reg8::C),
            0x54 => Indexed::LdR8Half(Reg8::D, Half::Hi),
            0x55 => Indexed::LdR8Half(Reg8::D, Half::Lo),
            0x56 => Indexed::LdR8Md(Reg8::D),
            0x5c => Indexed::LdR8Half(Reg8::E, Half::Hi),
            0x5d => Indexed::LdR8Half(Reg8::E, Half::Lo),
            0x5e => Indexed::LdR8Md(Reg8::E),

            0x60 => Indexed::LdHalfR8(Half::Hi, Reg8::B),
            0x61 => Indexed::LdHalfR8(Half::Hi, Reg8::C),
            0x62 => Indexed::LdHalfR8(Half::Hi, Reg8::D),
            0x63 => Indexed::LdHalfR8(Half::Hi, Reg8::E),
            0x64 => Indexed::LdHalfHalf(Half::Hi, Half::Hi),
            0x65 => Indexed::LdHalfHalf(Half::Hi, Half::Lo),
            0x66 => Indexed::LdR8Md(Reg8::H),
            0x67 => Indexed::LdHalfR8(Half::Hi, Reg8::A),
            0x68 => Indexed::LdHalfR8(Half::Lo, Reg8::B),
            0x69 => Indexed::LdHalfR8(Half::Lo, Reg8::C),
            0x6a => Indexed::LdHalfR8(Half::Lo, Reg8::D),
            0x6b => Indexed::LdHalfR8(Half::Lo, Reg8::E),
            0x6c => Indexed::LdHalfHalf(Half::Lo, Half::Hi),
            0x6d => Indexed::LdHalfHalf(Half::Lo, Half::Lo),
            0x6e => Indexed::LdR8Md(Reg8::L),
            0x6f => Indexed::LdHalfR8(Half::Lo, Reg8::A),

            0x70 => Indexed::LdMdR8(Reg8::B),
            0x71 => Indexed::LdMdR8(Reg8::C),
            0x72 => Indexed::LdMdR8(Reg8::D),
            0x73 => Indexed::LdMdR8(Reg8::E),
            0x74 => Indexed::LdMdR8(Reg8::H),
            0x75 => Indexed::LdMdR8(Reg8::L),
            0x77 => Indexed::LdMdR8(Reg8::A),
            0x7c => Indexed::LdR8Half(Reg8::A, Half::Hi),
            0x7d => Indexed::LdR8Half(Reg8::A, Half::Lo),
            0x7e => Indexed::LdR8Md(Reg8::A),

            0x84 => Indexed::AluHalf(Alu::Add, Half::Hi),
            0x85 => Indexed::AluHalf(Alu::Add, Half::Lo),
            0x86 => Indexed::AluMd(Alu::Add),
            0x8c => Indexed::AluHalf(Alu::Adc, Half::Hi),
            0x8d => Indexed::AluHalf(Alu::Adc, Half::Lo),
            0x8e => Indexed::AluMd(Alu::Adc),
            0x94 => Indexed::AluHalf(Alu::Sub, Half::Hi),
            0x95 => Indexed::AluHalf(Alu::Sub, Half::Lo),
            0x96 => Indexed::AluMd(Alu::Sub),
            0x9c => Indexed::AluHalf(Alu::Sbc, Half::Hi),
            0x9d => Indexed::AluHalf(Alu::Sbc, Half::Lo),
            0x9e => Indexed::AluMd(Alu::Sbc),

            0xa4 => Indexed::AluHalf(Alu::And, Half::Hi),
            0xa5 => Indexed::AluHalf(Alu::And, Half::Lo),
            0xa6 => Indexed::AluMd(Alu::And),
            0xac => Indexed::AluHalf(Alu::Xor, Half::Hi),
            0xad => Indexed::AluHalf(Alu::Xor, Half::Lo),
            0xae => Indexed::AluMd(Alu::Xor),
            0xb4 => Indexed::AluHalf(Alu::Or, Half::Hi),
            0xb5 => Indexed::AluHalf(Alu::Or, Half::Lo),
            0xb6 => Indexed::AluMd(Alu::Or),
            0xbc => Indexed::AluHalf(Alu::Cp, Half::Hi),
            0xbd => Indexed::AluHalf(Alu::Cp, Half::Lo),
            0xbe => Indexed::AluMd(Alu::Cp),

            0xe1 => Indexed::PopIdx,
            0xe3 => Indexed::ExSpIdx,
            0xe5 => Indexed::PushIdx,
            0xe9 => Indexed::JpIdx,
            0xf9 => Indexed::LdSpIdx,

            _ => Indexed::Invalid(opcode),
        }
    }

    fn read_operand(self, peeker: &mut BusPeeker<'_>) -> Operand {
        match self {
            Indexed::AluMd(_)
            | Indexed::DecMd
            | Indexed::IncMd
            | Indexed::LdMdR8(_)
            | Indexed::LdR8Md(_) => Operand::I8(peeker.next_i8()),
            Indexed::LdMdI8 => {
                let disp = peeker.next_i8();
                Operand::I8U8(disp, peeker.next_u8())
            }
            Indexed::LdHalfI8(_) => Operand::U8(peeker.next_u8()),
            Indexed::LdIdxI16 | Indexed::LdIdxM16 | Indexed::LdM16Idx => {
                Operand::U16(peeker.next_u16())
            }
            _ => Operand::None,
        }
    }

    fn format(self, index: Index, operand: Operand) -> String {
        let mem = || format_indexed(index, operand.displacement());
        match self {
            Indexed::AddR16(Reg16::Hl) => format!("ADD {index},{index}"),
            Indexed::AddR16(reg) => format!("ADD {index},{reg}"),
            Indexed::AluHalf(alu, half) => alu.format(half.name(index)),
            Indexed::AluMd(alu) => alu.format(mem()),
            Indexed::DecHalf(half) => format!("DEC {}", half.name(index)),
            Indexed::DecIdx => format!("DEC {index}"),
            Indexed::DecMd => format!("DEC {}", mem()),
            Indexed::ExSpIdx => format!("EX (SP),{index}"),
            Indexed::IncHalf(half) => format!("INC {}", half.name(index)),
            Indexed::IncIdx => format!("INC {index}"),
            Indexed::IncMd => format!("INC {}", mem()),
            Indexed::Invalid(opcode) => {
                format!("DB ${:02X},${opcode:02X}", index.prefix())
            }
            Indexed::JpIdx => format!("JP ({index})"),
            Indexed::LdHalfHalf(h1, h2) => {
                format!("LD {},{}", h1.name(index), h2.name(index))
            }
            Indexed::LdHalfI8(half) => {
                format!("LD {},{}", half.name(index), format_u8(operand))
            }
            Indexed::LdHalfR8(half, reg) => {
                format!("LD {},{reg}", half.name(index))
            }
            Indexed::LdIdxI16 => format!("LD {index},{}", format_u16(operand)),
            Indexed::LdIdxM16 => {
                format!("LD {index},({})", format_u16(operand))
            }
            Indexed::LdM16Idx => {
                format!("LD ({}),{index}", format_u16(operand))
            }
            Indexed::LdMdI8 => format!("LD {},{}", mem(), format_u8(operand)),
            Indexed::LdMdR8(reg) => format!("LD {},{reg}", mem()),
            Indexed::LdR8Half(reg, half) => {
                format!("LD {reg},{}", half.name(index))
            }
            Indexed::LdR8Md(reg) => format!("LD {reg},{}", mem()),
            Indexed::LdSpIdx => format!("LD SP,{index}"),
            Indexed::PopIdx => format!("POP {index}"),
            Indexed::PushIdx => format!("PUSH {index}"),
        }
    }
}

//===========================================================================//

/// A fully-decoded opcode, from any of the Z80's opcode spaces.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// An operation with no prefix byte.
    Unprefixed(Unprefixed),
    /// A `CB`-prefixed bit operation on a register.
    Prefixed(Prefixed, Reg8),
    /// An `ED`-prefixed operation.
    Extended(Extended),
    /// A `DD`- or `FD`-prefixed operation.
    Indexed(Index, Indexed),
    /// A `DD CB` or `FD CB` bit operation on an indexed memory location.
    IndexedPrefixed(Index, Prefixed, Reg8),
}

impl Operation {
    /// The number of prefix and opcode bytes, not counting operand bytes.
    fn opcode_size(self) -> u16 {
        match self {
            Operation::Unprefixed(_) => 1,
            Operation::Prefixed(_, _)
            | Operation::Extended(_)
            | Operation::Indexed(_, _) => 2,
            Operation::IndexedPrefixed(_, _, _) => 3,
        }
    }
}

//===========================================================================//

/// An argument value for a Z80 processor instruction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operand {
    /// No operand.
    None,
    /// A signed 8-bit operand (a relative jump offset or an index
    /// displacement).
    I8(i8),
    /// An unsigned 8-bit operand.
    U8(u8),
    /// An unsigned 16-bit operand.
    U16(u16),
    /// An index displacement followed by an unsigned 8-bit operand.
    I8U8(i8, u8),
}

impl Operand {
    /// The size of this operand, in bytes.
    pub fn size(self) -> u16 {
        match self {
            Operand::None => 0,
            Operand::I8(_) | Operand::U8(_) => 1,
            Operand::U16(_) | Operand::I8U8(_, _) => 2,
        }
    }

    fn displacement(self) -> i8 {
        match self {
            Operand::I8(disp) | Operand::I8U8(disp, _) => disp,
            _ => 0,
        }
    }

    fn immediate(self) -> u16 {
        match self {
            Operand::U8(value) | Operand::I8U8(_, value) => u16::from(value),
            Operand::U16(value) => value,
            _ => 0,
        }
    }
}

//===========================================================================//

/// A complete instruction, including parameter values, for a Z80 processor.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Instruction {
    /// The operation to be performed.
    pub operation: Operation,
    /// The parameter value.
    pub operand: Operand,
}

impl Instruction {
    /// Returns the size of this instruction, in bytes (always 1 to 4).
    pub fn size(self) -> u16 {
        self.operation.opcode_size() + self.operand.size()
    }

    /// Returns false if this instruction is a byte sequence with no defined
    /// meaning, which will be formatted as raw `DB` data.
    pub fn is_defined(self) -> bool {
        !matches!(
            self.operation,
            Operation::Unprefixed(Unprefixed::Invalid(_))
                | Operation::Extended(Extended::Invalid(_))
                | Operation::Indexed(_, Indexed::Invalid(_))
        )
    }

    /// Reads and decodes a single Z80 instruction.  Reads past `$ffff` wrap
    /// around to `$0000`.
    pub fn decode(bus: &dyn SimBus, pc: u16) -> Instruction {
        let mut peeker = BusPeeker::new(bus, pc);
        let operation = match peeker.next_u8() {
            0xcb => {
                let (prefixed, reg) = Prefixed::decode(peeker.next_u8());
                Operation::Prefixed(prefixed, reg)
            }
            0xed => {
                Operation::Extended(Extended::from_opcode(peeker.next_u8()))
            }
            prefix @ (0xdd | 0xfd) => {
                let index = Index::from_prefix(prefix);
                match peeker.next_u8() {
                    0xcb => {
                        // The displacement comes before the final opcode.
                        let disp = peeker.next_i8();
                        let opcode = peeker.next_u8();
                        let (prefixed, reg) = Prefixed::decode(opcode);
                        return Instruction {
                            operation: Operation::IndexedPrefixed(
                                index, prefixed, reg,
                            ),
                            operand: Operand::I8(disp),
                        };
                    }
                    opcode => {
                        Operation::Indexed(index, Indexed::from_opcode(opcode))
                    }
                }
            }
            opcode => Operation::Unprefixed(Unprefixed::from_opcode(opcode)),
        };
        let operand = match operation {
            Operation::Unprefixed(op) => op.read_operand(&mut peeker),
            Operation::Extended(op) => op.read_operand(&mut peeker),
            Operation::Indexed(_, op) => op.read_operand(&mut peeker),
            Operation::Prefixed(_, _) | Operation::IndexedPrefixed(_, _, _) => {
                Operand::None
            }
        };
        Instruction { operation, operand }
    }

    /// Formats a disassembled Z80 instruction as a human-readable string.
    /// `addr` specifies the address of the start of the instruction, and is
    /// used to resolve relative jump targets.
    pub fn format(self, addr: u16) -> String {
        let operand = self.operand;
        match self.operation {
            Operation::Unprefixed(op) => op.format(operand, addr),
            Operation::Prefixed(prefixed, reg) => prefixed.format(reg),
            Operation::Extended(op) => op.format(operand),
            Operation::Indexed(index, op) => op.format(index, operand),
            Operation::IndexedPrefixed(index, prefixed, reg) => {
                prefixed.format_indexed(index, operand.displacement(), reg)
            }
        }
    }
}

//===========================================================================//

/// A single decoded instruction: its text, and the raw bytes it occupies.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DecodedInstruction {
    /// The rendered mnemonic and operands, e.g. `LD BC,$1234`.
    pub text: String,
    /// The bytes making up the instruction, in address order.
    pub bytes: Vec<u8>,
}

impl DecodedInstruction {
    /// Renders an already-decoded instruction that starts at `addr`,
    /// collecting its bytes from the bus.
    pub(crate) fn new(
        bus: &dyn SimBus,
        addr: u16,
        instruction: Instruction,
    ) -> DecodedInstruction {
        let bytes = (0..instruction.size())
            .map(|offset| bus.peek_byte(addr.wrapping_add(offset)))
            .collect();
        DecodedInstruction { text: instruction.format(addr), bytes }
    }

    /// Returns the number of bytes this instruction occupies (1 to 4).
    /// Callers walking through memory should advance by exactly this much.
    pub fn length(&self) -> usize {
        self.bytes.len()
    }
}

/// Decodes the instruction at `addr`.  This never fails: byte sequences with
/// no defined meaning are rendered as `DB` data, consuming just the bytes
/// that were examined to reject them.
pub fn decode(bus: &dyn SimBus, addr: u16) -> DecodedInstruction {
    DecodedInstruction::new(bus, addr, Instruction::decode(bus, addr))
}

//===========================================================================//

fn format_u8(operand: Operand) -> String {
    format!("${:02X}", operand.immediate() & 0xff)
}

fn format_u16(operand: Operand) -> String {
    format!("${:04X}", operand.immediate())
}

fn format_indexed(index: Index, disp: i8) -> String {
    format!("({index}{disp:+})")
}

// Relative jumps are always two bytes long, and are relative to the address
// just past the instruction.
fn format_relative(instruction_addr: u16, operand: Operand) -> String {
    let destination_addr = instruction_addr
        .wrapping_add(2)
        .wrapping_add_signed(i16::from(operand.displacement()));
    format!("${destination_addr:04X}")
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{Instruction, decode};
    use crate::bus::{FnBus, SimBus, new_ram_bus};

    fn make_test_bus(code: &[u8]) -> Box<dyn SimBus> {
        let mut ram = vec![0u8; 1 << 4];
        ram[..code.len()].copy_from_slice(code);
        new_ram_bus(ram.into_boxed_slice())
    }

    fn disassemble(code: &[u8]) -> String {
        let bus = make_test_bus(code);
        Instruction::decode(&*bus, 0).format(0)
    }

    fn disassemble_at(addr: u16, code: &[u8]) -> String {
        let bus = FnBus::new(|a: u16| {
            code.get(usize::from(a.wrapping_sub(addr))).copied().unwrap_or(0)
        });
        Instruction::decode(&bus, addr).format(addr)
    }

    fn size(code: &[u8]) -> u16 {
        Instruction::decode(&*make_test_bus(code), 0).size()
    }

    #[test]
    fn disassemble_miscellaneous() {
        assert_eq!(disassemble(&[0x00]), "NOP");
        assert_eq!(disassemble(&[0x76]), "HALT");
        assert_eq!(disassemble(&[0xf3]), "DI");
        assert_eq!(disassemble(&[0xfb]), "EI");
        assert_eq!(disassemble(&[0x07]), "RLCA");
        assert_eq!(disassemble(&[0x0f]), "RRCA");
        assert_eq!(disassemble(&[0x17]), "RLA");
        assert_eq!(disassemble(&[0x1f]), "RRA");
        assert_eq!(disassemble(&[0x27]), "DAA");
        assert_eq!(disassemble(&[0x2f]), "CPL");
        assert_eq!(disassemble(&[0x37]), "SCF");
        assert_eq!(disassemble(&[0x3f]), "CCF");
    }

    #[test]
    fn disassemble_exchange() {
        assert_eq!(disassemble(&[0x08]), "EX AF,AF'");
        assert_eq!(disassemble(&[0xd9]), "EXX");
        assert_eq!(disassemble(&[0xe3]), "EX (SP),HL");
        assert_eq!(disassemble(&[0xeb]), "EX DE,HL");
    }

    #[test]
    fn disassemble_inc_dec() {
        assert_eq!(disassemble(&[0x04]), "INC B");
        assert_eq!(disassemble(&[0x34]), "INC (HL)");
        assert_eq!(disassemble(&[0x3c]), "INC A");
        assert_eq!(disassemble(&[0x0d]), "DEC C");
        assert_eq!(disassemble(&[0x35]), "DEC (HL)");
        assert_eq!(disassemble(&[0x03]), "INC BC");
        assert_eq!(disassemble(&[0x33]), "INC SP");
        assert_eq!(disassemble(&[0x1b]), "DEC DE");
        assert_eq!(disassemble(&[0x3b]), "DEC SP");
    }

    #[test]
    fn disassemble_ld_r8() {
        assert_eq!(disassemble(&[0x40]), "LD B,B");
        assert_eq!(disassemble(&[0x5c]), "LD E,H");
        assert_eq!(disassemble(&[0x7e]), "LD A,(HL)");
        assert_eq!(disassemble(&[0x77]), "LD (HL),A");
        assert_eq!(disassemble(&[0x06, 0x34]), "LD B,$34");
        assert_eq!(disassemble(&[0x2e, 0xde]), "LD L,$DE");
        assert_eq!(disassemble(&[0x36, 0xf0]), "LD (HL),$F0");
    }

    #[test]
    fn disassemble_ld_memory() {
        assert_eq!(disassemble(&[0x02]), "LD (BC),A");
        assert_eq!(disassemble(&[0x0a]), "LD A,(BC)");
        assert_eq!(disassemble(&[0x12]), "LD (DE),A");
        assert_eq!(disassemble(&[0x1a]), "LD A,(DE)");
        assert_eq!(disassemble(&[0x22, 0x34, 0x12]), "LD ($1234),HL");
        assert_eq!(disassemble(&[0x2a, 0x34, 0x12]), "LD HL,($1234)");
        assert_eq!(disassemble(&[0x32, 0x78, 0x56]), "LD ($5678),A");
        assert_eq!(disassemble(&[0x3a, 0x78, 0x56]), "LD A,($5678)");
    }

    #[test]
    fn disassemble_ld_r16() {
        assert_eq!(disassemble(&[0x01, 0x34, 0x12]), "LD BC,$1234");
        assert_eq!(disassemble(&[0x11, 0x78, 0x56]), "LD DE,$5678");
        assert_eq!(disassemble(&[0x21, 0xbc, 0x9a]), "LD HL,$9ABC");
        assert_eq!(disassemble(&[0x31, 0xf0, 0xde]), "LD SP,$DEF0");
        assert_eq!(disassemble(&[0xf9]), "LD SP,HL");
        assert_eq!(disassemble(&[0x09]), "ADD HL,BC");
        assert_eq!(disassemble(&[0x39]), "ADD HL,SP");
    }

    #[test]
    fn disassemble_alu() {
        assert_eq!(disassemble(&[0x80]), "ADD A,B");
        assert_eq!(disassemble(&[0x8e]), "ADC A,(HL)");
        assert_eq!(disassemble(&[0x97]), "SUB A");
        assert_eq!(disassemble(&[0x9a]), "SBC A,D");
        assert_eq!(disassemble(&[0xa3]), "AND E");
        assert_eq!(disassemble(&[0xac]), "XOR H");
        assert_eq!(disassemble(&[0xb5]), "OR L");
        assert_eq!(disassemble(&[0xbf]), "CP A");
        assert_eq!(disassemble(&[0xc6, 0x12]), "ADD A,$12");
        assert_eq!(disassemble(&[0xce, 0x0a]), "ADC A,$0A");
        assert_eq!(disassemble(&[0xd6, 0x01]), "SUB $01");
        assert_eq!(disassemble(&[0xde, 0x80]), "SBC A,$80");
        assert_eq!(disassemble(&[0xe6, 0x0f]), "AND $0F");
        assert_eq!(disassemble(&[0xee, 0xff]), "XOR $FF");
        assert_eq!(disassemble(&[0xf6, 0x40]), "OR $40");
        assert_eq!(disassemble(&[0xfe, 0x3a]), "CP $3A");
    }

    #[test]
    fn disassemble_jr() {
        assert_eq!(disassemble(&[0x18, 0x20]), "JR $0022");
        assert_eq!(disassemble(&[0x38, 0x7f]), "JR C,$0081");
        assert_eq!(disassemble(&[0x30, 0x00]), "JR NC,$0002");
        assert_eq!(disassemble(&[0x28, 0xfc]), "JR Z,$FFFE");
        assert_eq!(disassemble(&[0x20, 0x80]), "JR NZ,$FF82");
        assert_eq!(disassemble(&[0x10, 0x05]), "DJNZ $0007");
        assert_eq!(disassemble_at(0x0100, &[0x18, 0xfe]), "JR $0100");
        assert_eq!(disassemble_at(0xfffe, &[0x18, 0x01]), "JR $0001");
    }

    #[test]
    fn disassemble_jp_call_ret() {
        assert_eq!(disassemble(&[0xc3, 0x00, 0x80]), "JP $8000");
        assert_eq!(disassemble(&[0xca, 0xfe, 0xff]), "JP Z,$FFFE");
        assert_eq!(disassemble(&[0xf2, 0x34, 0x12]), "JP P,$1234");
        assert_eq!(disassemble(&[0xe9]), "JP (HL)");
        assert_eq!(disassemble(&[0xcd, 0x34, 0x12]), "CALL $1234");
        assert_eq!(disassemble(&[0xdc, 0x00, 0x10]), "CALL C,$1000");
        assert_eq!(disassemble(&[0xe4, 0x00, 0x10]), "CALL PO,$1000");
        assert_eq!(disassemble(&[0xc9]), "RET");
        assert_eq!(disassemble(&[0xc0]), "RET NZ");
        assert_eq!(disassemble(&[0xe8]), "RET PE");
        assert_eq!(disassemble(&[0xf8]), "RET M");
        assert_eq!(disassemble(&[0xc7]), "RST $00");
        assert_eq!(disassemble(&[0xd7]), "RST $10");
        assert_eq!(disassemble(&[0xff]), "RST $38");
    }

    #[test]
    fn disassemble_stack_and_io() {
        assert_eq!(disassemble(&[0xc1]), "POP BC");
        assert_eq!(disassemble(&[0xe1]), "POP HL");
        assert_eq!(disassemble(&[0xf1]), "POP AF");
        assert_eq!(disassemble(&[0xd5]), "PUSH DE");
        assert_eq!(disassemble(&[0xf5]), "PUSH AF");
        assert_eq!(disassemble(&[0xd3, 0xfe]), "OUT ($FE),A");
        assert_eq!(disassemble(&[0xdb, 0x1f]), "IN A,($1F)");
    }

    #[test]
    fn disassemble_bit_operations() {
        assert_eq!(disassemble(&[0xcb, 0x00]), "RLC B");
        assert_eq!(disassemble(&[0xcb, 0x0e]), "RRC (HL)");
        assert_eq!(disassemble(&[0xcb, 0x17]), "RL A");
        assert_eq!(disassemble(&[0xcb, 0x19]), "RR C");
        assert_eq!(disassemble(&[0xcb, 0x22]), "SLA D");
        assert_eq!(disassemble(&[0xcb, 0x2b]), "SRA E");
        assert_eq!(disassemble(&[0xcb, 0x34]), "SLL H");
        assert_eq!(disassemble(&[0xcb, 0x3d]), "SRL L");
        assert_eq!(disassemble(&[0xcb, 0x46]), "BIT 0,(HL)");
        assert_eq!(disassemble(&[0xcb, 0x7f]), "BIT 7,A");
        assert_eq!(disassemble(&[0xcb, 0x98]), "RES 3,B");
        assert_eq!(disassemble(&[0xcb, 0xf1]), "SET 6,C");
    }

    #[test]
    fn disassemble_extended() {
        assert_eq!(disassemble(&[0xed, 0x40]), "IN B,(C)");
        assert_eq!(disassemble(&[0xed, 0x79]), "OUT (C),A");
        assert_eq!(disassemble(&[0xed, 0x70]), "IN (C)");
        assert_eq!(disassemble(&[0xed, 0x71]), "OUT (C),0");
        assert_eq!(disassemble(&[0xed, 0x42]), "SBC HL,BC");
        assert_eq!(disassemble(&[0xed, 0x62]), "SBC HL,HL");
        assert_eq!(disassemble(&[0xed, 0x7a]), "ADC HL,SP");
        assert_eq!(disassemble(&[0xed, 0x43, 0x34, 0x12]), "LD ($1234),BC");
        assert_eq!(disassemble(&[0xed, 0x7b, 0x00, 0xc0]), "LD SP,($C000)");
        assert_eq!(disassemble(&[0xed, 0x44]), "NEG");
        assert_eq!(disassemble(&[0xed, 0x45]), "RETN");
        assert_eq!(disassemble(&[0xed, 0x4d]), "RETI");
        assert_eq!(disassemble(&[0xed, 0x46]), "IM 0");
        assert_eq!(disassemble(&[0xed, 0x56]), "IM 1");
        assert_eq!(disassemble(&[0xed, 0x5e]), "IM 2");
        assert_eq!(disassemble(&[0xed, 0x47]), "LD I,A");
        assert_eq!(disassemble(&[0xed, 0x4f]), "LD R,A");
        assert_eq!(disassemble(&[0xed, 0x57]), "LD A,I");
        assert_eq!(disassemble(&[0xed, 0x5f]), "LD A,R");
        assert_eq!(disassemble(&[0xed, 0x67]), "RRD");
        assert_eq!(disassemble(&[0xed, 0x6f]), "RLD");
    }

    #[test]
    fn disassemble_block_operations() {
        let expected = [
            (0xa0, "LDI"),
            (0xa1, "CPI"),
            (0xa2, "INI"),
            (0xa3, "OUTI"),
            (0xa8, "LDD"),
            (0xa9, "CPD"),
            (0xaa, "IND"),
            (0xab, "OUTD"),
            (0xb0, "LDIR"),
            (0xb1, "CPIR"),
            (0xb2, "INIR"),
            (0xb3, "OTIR"),
            (0xb8, "LDDR"),
            (0xb9, "CPDR"),
            (0xba, "INDR"),
            (0xbb, "OTDR"),
        ];
        for (opcode, mnemonic) in expected {
            assert_eq!(disassemble(&[0xed, opcode]), mnemonic);
            assert_eq!(size(&[0xed, opcode]), 2);
        }
    }

    #[test]
    fn disassemble_indexed() {
        assert_eq!(disassemble(&[0xdd, 0x21, 0x34, 0x12]), "LD IX,$1234");
        assert_eq!(disassemble(&[0xfd, 0x21, 0x34, 0x12]), "LD IY,$1234");
        assert_eq!(disassemble(&[0xdd, 0x22, 0x34, 0x12]), "LD ($1234),IX");
        assert_eq!(disassemble(&[0xfd, 0x2a, 0x34, 0x12]), "LD IY,($1234)");
        assert_eq!(disassemble(&[0xdd, 0x09]), "ADD IX,BC");
        assert_eq!(disassemble(&[0xdd, 0x29]), "ADD IX,IX");
        assert_eq!(disassemble(&[0xfd, 0x39]), "ADD IY,SP");
        assert_eq!(disassemble(&[0xdd, 0x23]), "INC IX");
        assert_eq!(disassemble(&[0xfd, 0x2b]), "DEC IY");
        assert_eq!(disassemble(&[0xdd, 0xe1]), "POP IX");
        assert_eq!(disassemble(&[0xfd, 0xe5]), "PUSH IY");
        assert_eq!(disassemble(&[0xdd, 0xe3]), "EX (SP),IX");
        assert_eq!(disassemble(&[0xdd, 0xe9]), "JP (IX)");
        assert_eq!(disassemble(&[0xfd, 0xf9]), "LD SP,IY");
    }

    #[test]
    fn disassemble_indexed_memory() {
        assert_eq!(disassemble(&[0xdd, 0x34, 0x05]), "INC (IX+5)");
        assert_eq!(disassemble(&[0xfd, 0x35, 0xfd]), "DEC (IY-3)");
        assert_eq!(disassemble(&[0xdd, 0x36, 0x02, 0x7f]), "LD (IX+2),$7F");
        assert_eq!(disassemble(&[0xdd, 0x46, 0x00]), "LD B,(IX+0)");
        assert_eq!(disassemble(&[0xfd, 0x66, 0x80]), "LD H,(IY-128)");
        assert_eq!(disassemble(&[0xdd, 0x75, 0x7f]), "LD (IX+127),L");
        assert_eq!(disassemble(&[0xfd, 0x77, 0x01]), "LD (IY+1),A");
        assert_eq!(disassemble(&[0xdd, 0x96, 0x10]), "SUB (IX+16)");
        assert_eq!(disassemble(&[0xdd, 0x86, 0x00]), "ADD A,(IX+0)");
        assert_eq!(disassemble(&[0xfd, 0xbe, 0xff]), "CP (IY-1)");
    }

    #[test]
    fn disassemble_index_halves() {
        assert_eq!(disassemble(&[0xdd, 0x24]), "INC IXH");
        assert_eq!(disassemble(&[0xfd, 0x2d]), "DEC IYL");
        assert_eq!(disassemble(&[0xdd, 0x26, 0x12]), "LD IXH,$12");
        assert_eq!(disassemble(&[0xfd, 0x2e, 0x34]), "LD IYL,$34");
        assert_eq!(disassemble(&[0xdd, 0x44]), "LD B,IXH");
        assert_eq!(disassemble(&[0xfd, 0x7d]), "LD A,IYL");
        assert_eq!(disassemble(&[0xdd, 0x60]), "LD IXH,B");
        assert_eq!(disassemble(&[0xdd, 0x65]), "LD IXH,IXL");
        assert_eq!(disassemble(&[0xfd, 0x6c]), "LD IYL,IYH");
        assert_eq!(disassemble(&[0xdd, 0x6f]), "LD IXL,A");
        assert_eq!(disassemble(&[0xdd, 0x84]), "ADD A,IXH");
        assert_eq!(disassemble(&[0xfd, 0x9d]), "SBC A,IYL");
        assert_eq!(disassemble(&[0xdd, 0xb4]), "OR IXH");
    }

    #[test]
    fn disassemble_indexed_bit_operations() {
        assert_eq!(disassemble(&[0xdd, 0xcb, 0x05, 0x06]), "RLC (IX+5)");
        assert_eq!(disassemble(&[0xfd, 0xcb, 0xfe, 0x0e]), "RRC (IY-2)");
        assert_eq!(disassemble(&[0xdd, 0xcb, 0x01, 0x00]), "RLC (IX+1),B");
        assert_eq!(disassemble(&[0xdd, 0xcb, 0x10, 0x36]), "SLL (IX+16)");
        assert_eq!(disassemble(&[0xdd, 0xcb, 0x00, 0x46]), "BIT 0,(IX+0)");
        assert_eq!(disassemble(&[0xdd, 0xcb, 0x00, 0x47]), "BIT 0,(IX+0)");
        assert_eq!(disassemble(&[0xfd, 0xcb, 0x03, 0x9e]), "RES 3,(IY+3)");
        assert_eq!(disassemble(&[0xfd, 0xcb, 0x03, 0x9f]), "RES 3,(IY+3),A");
        assert_eq!(disassemble(&[0xdd, 0xcb, 0xff, 0xfe]), "SET 7,(IX-1)");
        assert_eq!(disassemble(&[0xdd, 0xcb, 0xff, 0xf9]), "SET 7,(IX-1),C");
    }

    #[test]
    fn disassemble_undefined() {
        assert_eq!(disassemble(&[0xed, 0x00]), "DB $ED,$00");
        assert_eq!(disassemble(&[0xed, 0x4c]), "DB $ED,$4C");
        assert_eq!(disassemble(&[0xed, 0x77]), "DB $ED,$77");
        assert_eq!(disassemble(&[0xed, 0xff]), "DB $ED,$FF");
        assert_eq!(disassemble(&[0xdd, 0x00]), "DB $DD,$00");
        assert_eq!(disassemble(&[0xdd, 0x40]), "DB $DD,$40");
        assert_eq!(disassemble(&[0xfd, 0x76]), "DB $FD,$76");
        assert_eq!(disassemble(&[0xdd, 0xdd]), "DB $DD,$DD");
        assert_eq!(disassemble(&[0xfd, 0xed]), "DB $FD,$ED");
    }

    #[test]
    fn instruction_sizes() {
        assert_eq!(size(&[0x00]), 1);
        assert_eq!(size(&[0x3e, 0x00]), 2);
        assert_eq!(size(&[0x18, 0x00]), 2);
        assert_eq!(size(&[0xc3, 0x00, 0x00]), 3);
        assert_eq!(size(&[0xcb, 0x00]), 2);
        assert_eq!(size(&[0xed, 0x44]), 2);
        assert_eq!(size(&[0xed, 0x43, 0x00, 0x00]), 4);
        assert_eq!(size(&[0xed, 0x00]), 2);
        assert_eq!(size(&[0xdd, 0x23]), 2);
        assert_eq!(size(&[0xdd, 0x26, 0x00]), 3);
        assert_eq!(size(&[0xdd, 0x34, 0x00]), 3);
        assert_eq!(size(&[0xdd, 0x36, 0x00, 0x00]), 4);
        assert_eq!(size(&[0xdd, 0x21, 0x00, 0x00]), 4);
        assert_eq!(size(&[0xdd, 0xcb, 0x00, 0x06]), 4);
        assert_eq!(size(&[0xfd, 0x00]), 2);
    }

    #[test]
    fn defined_instructions() {
        let bus = make_test_bus(&[0xed, 0x00]);
        assert!(!Instruction::decode(&*bus, 0).is_defined());
        let bus = make_test_bus(&[0xdd, 0x00]);
        assert!(!Instruction::decode(&*bus, 0).is_defined());
        let bus = make_test_bus(&[0xed, 0xb0]);
        assert!(Instruction::decode(&*bus, 0).is_defined());
        let bus = make_test_bus(&[0xdd, 0xcb, 0x00, 0x00]);
        assert!(Instruction::decode(&*bus, 0).is_defined());
    }

    #[test]
    fn decode_collects_bytes() {
        let bus = make_test_bus(&[0xdd, 0x36, 0xfe, 0x42]);
        let decoded = decode(&*bus, 0);
        assert_eq!(decoded.text, "LD (IX-2),$42");
        assert_eq!(decoded.bytes, vec![0xdd, 0x36, 0xfe, 0x42]);
        assert_eq!(decoded.length(), 4);
    }

    #[test]
    fn decode_bytes_wrap_around() {
        let bus = FnBus::new(|addr: u16| match addr {
            0xffff => 0xc3,
            0x0000 => 0x34,
            0x0001 => 0x12,
            _ => 0x00,
        });
        let decoded = decode(&bus, 0xffff);
        assert_eq!(decoded.text, "JP $1234");
        assert_eq!(decoded.bytes, vec![0xc3, 0x34, 0x12]);
    }
}

//===========================================================================//
