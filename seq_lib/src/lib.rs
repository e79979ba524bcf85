pub mod mega_press;
