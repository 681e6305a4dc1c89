//! A two-pass assembler for the Hartz teaching machine.
//!
//! Hartz assembly is a small line-oriented language: one instruction,
//! label, constant or function declaration per line. The assembler
//! translates it into fixed-width instruction words written as text,
//! one binary word per line.
//!
//! # Usage
//!
//! Source is parsed into a [`Program`](asm::Program) (the first pass),
//! whose symbol references are then resolved (the second pass):
//! ```
//! use hartz::parse::parse_program;
//!
//! let code = "
//!     .SLOT 3
//!     START:
//!         LW $D1, SLOT    ; load
//!         BEZ $S1, END
//!         JMP START
//!     END: HALT
//! ";
//! let program = parse_program(code.as_bytes());
//! let asm = program.resolve().unwrap();
//!
//! let mut out = vec![];
//! asm.write_words(&mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "\
//!     0111000011\n\
//!     1000000010\n\
//!     1010110100\n\
//!     1111000000\n\
//! ");
//! ```
//!
//! Both passes can also be done at once with [`asm::assemble`].
//!
//! If assembly fails, the returned [`Report`](asm::Report) holds every error
//! along with the source line it occurred on:
//! ```
//! use hartz::asm::assemble;
//!
//! let report = assemble("JMP NOWHERE".as_bytes()).unwrap_err();
//! assert_eq!(report.exit_code(), 2);
//! eprintln!("{report}");
//! ```
#![warn(missing_docs)]

pub mod parse;
pub mod ast;
pub mod asm;
pub mod err;
