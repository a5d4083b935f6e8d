//! Pipeline primitives: the operations steps are made of.
//!
//! Each submodule implements exactly one kind of side effect. Keeping
//! them separate makes each independently testable and keeps the step
//! dispatch in [`crate::step`] a thin match over data.
//!
//! ## Operations
//!
//! 1. [`process`]   — spawn an external collaborator tool, capture its
//!    output, succeed only on exit 0
//! 2. [`fsops`]     — move the stage file between stage directories
//!    (rename with overwrite, copy with parent creation)
//! 3. [`http`]      — the three document-generation service calls
//!    (upload, render, stamp), all multipart POSTs
//! 4. [`pagecount`] — the page-count resolver and its fallback strategies
//! 5. [`stamp`]     — the sequential per-page stamping loop

pub mod fsops;
pub mod http;
pub mod pagecount;
pub mod process;
pub mod stamp;
