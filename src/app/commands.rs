//! Inbound commands to the control service.
//!
//! These represent actions requested by the outside world (web UI, serial
//! console) that the [`ControlService`](super::service::ControlService)
//! applies between ticks.
//!
//! Wire form is a JSON object tagged by `"command"`:
//!
//! ```text
//! {"command": "start"}
//! {"command": "setpoint", "setpoint": 220.0}
//! {"command": "load", "name": "bisque"}
//! {"command": "configure", "config": {"Kp": 0.02, "Period": 2}}
//! {"command": "list_profiles"}
//! {"command": "save_profile", "profile": {"name": "bisque", "instructions": [...]}}
//! {"command": "delete_profile", "name": "bisque"}
//! {"command": "get_settings"}
//! ```
//!
//! The last four answer on the reply channel with a
//! [`Reply`](super::events::Reply).

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::ControllerConfig;
use crate::control::profile::Profile;

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Start,
    Stop,
    Pause,
    Resume,
    /// Stop and rebuild the PID from the current gains.
    Reset,

    /// Drop any profile and regulate to a fixed temperature.
    Setpoint { setpoint: f32 },

    /// Load a stored profile, or unload with `null`.
    Load {
        #[serde(default)]
        name: Option<String>,
    },

    /// Validate, apply and persist new controller configuration.
    Configure { config: ControllerConfig },

    /// Names of the stored profiles.
    ListProfiles,

    /// Store a profile under its own name, replacing any with that name.
    SaveProfile { profile: Profile },

    DeleteProfile { name: String },

    /// The configuration the kernel is running with.
    GetSettings,
}

impl Command {
    /// Parse the JSON wire form.  Malformed input is logged and ignored.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str(text) {
            Ok(cmd) => Some(cmd),
            Err(e) => {
                warn!("Ignoring command {:?}: {}", text, e);
                None
            }
        }
    }
}
