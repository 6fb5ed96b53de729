use g2xtb::engine::native::{DEFAULT_LIBRARY, DEFAULT_SYMBOL};

pub struct DefaultsConfig {
    pub print_level: i32,
    pub parallel: i32,
    pub accuracy: f64,
    pub electronic_temperature: f64,
    pub max_iterations: i32,
    pub library: String,
    pub symbol: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            print_level: 1,
            parallel: 0,
            accuracy: 1.0,
            electronic_temperature: 300.0,
            max_iterations: 250,
            library: DEFAULT_LIBRARY.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
        }
    }
}
