mod item_text;

pub use item_text::ItemTextParser;
