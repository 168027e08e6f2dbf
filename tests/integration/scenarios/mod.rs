//! End-to-end scenarios covering a whole night
