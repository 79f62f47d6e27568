//! Synthetic modules and the comparisons run over them.

pub(crate) mod builder;
