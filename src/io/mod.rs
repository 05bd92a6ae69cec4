mod input;

pub use input::InputHandler;
