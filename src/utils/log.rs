use log::LevelFilter;

pub struct Logger;

impl Logger {
    /// Colored level prefixes on stderr. `RUST_LOG` still overrides per module.
    pub fn init(verbosity: LevelFilter) {
        let mut builder = colog::default_builder();
        builder.filter_level(verbosity);
        builder.parse_env(env_logger::Env::default());

        // a second init (tests) is harmless
        let _ = builder.try_init();
    }
}
