mod chromium;
mod driver;
#[cfg(test)]
pub mod fake;

pub use chromium::ChromiumDriver;
pub use driver::{Bounds, BrowserDriver, ElementRef};
