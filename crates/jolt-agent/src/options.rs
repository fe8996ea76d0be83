//! Attach-time argument string.
//!
//! The host hands the agent a single string of comma-separated `key=value`
//! (or bare `key`) pairs. Parsing never fails: every segment becomes one
//! entry, unknown keys are kept and ignored.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::logging::AGENT_TARGET;

pub const DEFAULT_PORT: u16 = 2020;
/// Suffix every precompiled trace artifact must carry.
pub const ARTIFACT_SUFFIX: &str = ".class";

pub const USAGE: &str = "\
Usage: -javaagent:jolt-agent.jar=[<option>[,<option>...]]

Options:
  help                      print this message and exit
  debug[=true|false]        log agent activity (default: false)
  dumpClasses[=true|false]  write instrumented classes to disk (default: false)
  dumpDir=<dir>             root directory for dumped classes (default: .)
  probeDescPath=<path>      probe descriptor search path (default: .)
  script=<file.class>       precompiled trace to install at startup
  port=<port>               port to accept trace clients on (default: 2020)
  noServer[=true|false]     do not accept trace clients
  bootClassPath=<jars>      archives appended to the bootstrap class search path
  systemClassPath=<jars>    archives appended to the system class search path";

/// Raw key/value pairs as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentArgs {
    entries: BTreeMap<String, String>,
}

impl AgentArgs {
    pub fn parse(args: &str) -> Self {
        let entries = args
            .split(',')
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
                None => (segment.trim().to_string(), String::new()),
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Boolean keys are on when present with any value other than `false`,
    /// so a bare `debug` enables debugging.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| value != "false")
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

/// Settings derived from [`AgentArgs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub help: bool,
    pub debug: bool,
    pub dump_classes: bool,
    pub dump_dir: PathBuf,
    pub probe_desc_path: String,
    pub script: Option<PathBuf>,
    pub port: u16,
    pub no_server: bool,
    pub boot_class_path: Option<String>,
    pub system_class_path: Option<String>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            help: false,
            debug: false,
            dump_classes: false,
            dump_dir: PathBuf::from("."),
            probe_desc_path: ".".to_string(),
            script: None,
            port: DEFAULT_PORT,
            no_server: false,
            boot_class_path: None,
            system_class_path: None,
        }
    }
}

impl AgentOptions {
    pub fn from_args(args: &AgentArgs) -> Self {
        let port = match args.get("port") {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    target: AGENT_TARGET,
                    port = raw,
                    default = DEFAULT_PORT,
                    "invalid port, assuming default"
                );
                DEFAULT_PORT
            }),
        };

        Self {
            help: args.get("help").is_some(),
            debug: args.flag("debug"),
            dump_classes: args.flag("dumpClasses"),
            dump_dir: args.get("dumpDir").map_or_else(|| PathBuf::from("."), PathBuf::from),
            probe_desc_path: args.get("probeDescPath").unwrap_or(".").to_string(),
            script: args.get("script").map(PathBuf::from),
            port,
            no_server: args.flag("noServer"),
            boot_class_path: args.get("bootClassPath").map(str::to_string),
            system_class_path: args.get("systemClassPath").map(str::to_string),
        }
    }

    pub fn parse(args: &str) -> Self {
        Self::from_args(&AgentArgs::parse(args))
    }
}
