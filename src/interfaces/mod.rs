//! View layers that drive the checkout and render its state.

pub mod terminal;
