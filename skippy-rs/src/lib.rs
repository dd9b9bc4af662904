//! Spreadsheet-driven instrument automation.
//!
//! A run document is a CSV file with two tables: variables and commands.
//! [`document::load`] parses it, [`Interpreter`] executes the commands
//! against an instrument opened through a [`transport::Connector`].
//!
//! ```rust
//! use skippy::{document, Interpreter};
//! use skippy::transport::{Exchange, SimInstrument};
//!
//! let doc = document::parse(
//!     "Variable,Value\nAddress,SIM::INSTR\nN,2\n\n\
//!      Operation,Command,SpecialOp,SpecialOpArg\n\
//!      Write,VOLT $X,Iterate,$N\n\
//!      Query,VOLT?,Update,$Last\n",
//! )
//! .unwrap();
//!
//! let sim = SimInstrument::new();
//! let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let mut interp = Interpreter::new(doc);
//! rt.block_on(interp.run(&sim)).unwrap();
//!
//! assert_eq!(interp.vars.get("Last"), Some("2"));
//! assert_eq!(sim.transcript()[0], Exchange::Write("VOLT 1".to_owned()));
//! ```

pub mod cancel;
pub mod cli;
pub mod command;
pub mod config;
pub mod document;
pub mod duration;
pub mod error;
pub mod expand;
pub mod interp;
pub mod transport;
pub mod var;

// Re-exports for convenience.
pub use cancel::CancelToken;
pub use command::{Command, Operation, SpecialOp};
pub use document::Document;
pub use error::{Error, Result};
pub use interp::{Interpreter, Outcome, RunSummary, Step};
pub use var::VarStore;
