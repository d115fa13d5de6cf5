//! Maps a task's free-text `required_skills[]` (§3) onto the Router's typed
//! [`registry::Capabilities`] bitset.

use registry::Capabilities;

pub fn capabilities_from_skills(skills: &[String]) -> Capabilities {
    let mut capabilities = Capabilities::default();
    for skill in skills {
        match skill.as_str() {
            "tools" => capabilities.tools = true,
            "vision" => capabilities.vision = true,
            "reasoning" => capabilities.reasoning = true,
            "thinking" => capabilities.thinking = true,
            "json_mode" => capabilities.json_mode = true,
            other => log::debug!("ignoring unrecognized required_skill '{other}'"),
        }
    }
    capabilities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_skills() {
        let caps = capabilities_from_skills(&["vision".to_string(), "tools".to_string()]);
        assert!(caps.vision);
        assert!(caps.tools);
        assert!(!caps.reasoning);
    }

    #[test]
    fn ignores_unknown_skills() {
        let caps = capabilities_from_skills(&["telekinesis".to_string()]);
        assert_eq!(caps, Capabilities::default());
    }
}
