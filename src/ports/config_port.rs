//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Optional float: `None` when the key is absent or blank.
    fn get_opt_double(&self, section: &str, key: &str) -> Option<f64> {
        self.get_string(section, key)
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| s.trim().parse().ok())
    }
}
