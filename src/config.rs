//! Session configuration.
//!
//! These are the switches the driver sets once per compilation; nothing in
//! the binder changes them afterwards.

/// Compilation-session switches consumed by the binder.
#[derive(Debug, Clone)]
pub struct Config {
    /// Import path of the package being compiled.
    pub package_path: String,
    /// Name of the package being compiled (`main` enables the `main` check).
    pub package_name: String,
    /// Import path of the runtime package.
    pub runtime_path: String,
    /// Name of the runtime function that runs its argument on another stack.
    pub alternate_stack_func: String,
    /// Function-value symbols are created explicitly rather than on demand.
    pub dynlink: bool,
    /// The package being compiled is the runtime itself.
    pub compiling_runtime: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            package_path: String::from("main"),
            package_name: String::from("main"),
            runtime_path: String::from("runtime"),
            alternate_stack_func: String::from("systemstack"),
            dynlink: false,
            compiling_runtime: false,
        }
    }
}

impl Config {
    pub fn new(package_path: &str, package_name: &str) -> Self {
        Config {
            package_path: package_path.to_string(),
            package_name: package_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_runtime(mut self, runtime_path: &str, alternate_stack_func: &str) -> Self {
        self.runtime_path = runtime_path.to_string();
        self.alternate_stack_func = alternate_stack_func.to_string();
        self
    }

    pub fn with_dynlink(mut self, dynlink: bool) -> Self {
        self.dynlink = dynlink;
        self
    }

    pub fn compiling_runtime(mut self, compiling_runtime: bool) -> Self {
        self.compiling_runtime = compiling_runtime;
        self
    }

    /// Whether the package being compiled is the runtime package.
    pub fn is_runtime_package(&self) -> bool {
        self.compiling_runtime || self.package_path == self.runtime_path
    }
}
