//! Pure helpers shared by the target builder, the index layer and the
//! documentation table parser.

pub mod naming;
