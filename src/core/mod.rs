// Core modules: table model, text and packed codecs, gather, and error modeling.
pub mod cell_format;
pub mod codec;
pub mod column;
pub mod error;
pub mod filter;
pub mod format;
pub mod gather;
pub mod keys;
pub mod packed;
pub mod report;
pub mod table;
pub mod value;
