pub mod checkout_renderer;
