use once_cell::sync::Lazy;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_COMMIT: Option<&str> = option_env!("SIGGO_GIT_COMMIT");
pub const BUILD_DATE: Option<&str> = option_env!("SIGGO_BUILD_DATE");

pub static OS_ARCH: Lazy<String> =
    Lazy::new(|| format!("{} {}", std::env::consts::OS, std::env::consts::ARCH));

pub fn long_version() -> String {
    let mut out = format!("siggo {VERSION}");
    if let Some(commit) = GIT_COMMIT {
        out.push_str(&format!(" ({commit})"));
    }
    if let Some(date) = BUILD_DATE {
        out.push_str(&format!(" built {date}"));
    }
    out.push_str(&format!(" {}", *OS_ARCH));
    out
}
