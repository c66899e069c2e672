//! Cross-crate scenarios live under `tests/`; this crate exports nothing.
