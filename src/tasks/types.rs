use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("could not start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}\noutput: {output}")]
    Failed {
        command: String,
        status: String,
        output: String,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    #[error("docker engine rejected {action} of {target}: {source}")]
    Engine {
        action: &'static str,
        target: String,
        #[source]
        source: bollard::errors::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortMappingError {
    #[error("port mapping is empty")]
    Empty,

    #[error("port mapping `{0}` must look like [ip:]host:container[/proto]")]
    Malformed(String),

    #[error("`{0}` is not a valid port number")]
    InvalidPort(String),
}

/// A `docker run -p` style binding, e.g. `5104:80` or `127.0.0.1:5104:80/tcp`.
///
/// One port per side; ranges such as `5000-5010:80` are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMapping {
    pub host_ip: Option<String>,
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: String,
}

impl PortMapping {
    /// Key used by the engine API for exposed ports and bindings (`80/tcp`).
    pub fn container_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

impl FromStr for PortMapping {
    type Err = PortMappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortMappingError::Empty);
        }

        let (ports, protocol) = match s.rsplit_once('/') {
            Some((ports, proto)) if proto == "tcp" || proto == "udp" || proto == "sctp" => {
                (ports, proto.to_string())
            }
            Some(_) => return Err(PortMappingError::Malformed(s.to_string())),
            None => (s, "tcp".to_string()),
        };

        // An IPv6 host address is bracketed: `[::1]:5104:80`.
        let (bracketed_ip, ports) = match ports.strip_prefix('[') {
            Some(rest) => match rest.split_once("]:") {
                Some((ip, ports)) if !ip.is_empty() => (Some(ip), ports),
                _ => return Err(PortMappingError::Malformed(s.to_string())),
            },
            None => (None, ports),
        };

        let parts: Vec<&str> = ports.split(':').collect();
        let (host_ip, host_port, container_port) = match (bracketed_ip, parts.as_slice()) {
            (Some(ip), [host, container]) => (Some(ip.to_string()), *host, *container),
            (None, [host, container]) => (None, *host, *container),
            (None, [ip, host, container]) if !ip.is_empty() => {
                (Some(ip.to_string()), *host, *container)
            }
            _ => return Err(PortMappingError::Malformed(s.to_string())),
        };

        let parse_port = |raw: &str| {
            raw.parse::<u16>()
                .ok()
                .filter(|port| *port != 0)
                .ok_or_else(|| PortMappingError::InvalidPort(raw.to_string()))
        };

        Ok(PortMapping {
            host_ip,
            host_port: parse_port(host_port)?,
            container_port: parse_port(container_port)?,
            protocol,
        })
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.host_ip {
            Some(ip) if ip.contains(':') => write!(f, "[{}]:", ip)?,
            Some(ip) => write!(f, "{}:", ip)?,
            None => {}
        }
        write!(f, "{}:{}", self.host_port, self.container_port)?;
        if self.protocol != "tcp" {
            write!(f, "/{}", self.protocol)?;
        }
        Ok(())
    }
}

/// The one container this service keeps running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub ports: PortMapping,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, ports: PortMapping) -> Self {
        ContainerSpec {
            name: name.into(),
            ports,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Pull,
    Stop,
    Remove,
    Run,
}

impl Step {
    pub const SEQUENCE: [Step; 4] = [Step::Pull, Step::Stop, Step::Remove, Step::Run];

    /// Stop and remove are allowed to fail: there may be no old instance.
    pub fn is_cleanup(self) -> bool {
        matches!(self, Step::Stop | Step::Remove)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Pull => "pull",
            Step::Stop => "stop",
            Step::Remove => "rm",
            Step::Run => "run",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct StepOutcome {
    pub step: Step,
    pub result: Result<String, CommandError>,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct RedeployReport {
    pub image: String,
    pub container: String,
    pub steps: Vec<StepOutcome>,
}

impl RedeployReport {
    /// True when pull or run failed. Cleanup failures never count.
    pub fn failed(&self) -> bool {
        self.steps
            .iter()
            .any(|outcome| !outcome.step.is_cleanup() && !outcome.is_ok())
    }

    pub fn executed(&self) -> Vec<Step> {
        self.steps.iter().map(|outcome| outcome.step).collect()
    }
}
