use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Deserialize;

/// Which voting strategy a board uses to pick a winning draft in Stage 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusStrategy {
    /// Sum rank positions across all ballots, lowest total wins.
    BordaCount,
    /// Borda picks a top-3 shortlist, the chairman labels the winner.
    ChairmanCut,
}

impl Default for ConsensusStrategy {
    fn default() -> Self {
        Self::BordaCount
    }
}

/// One configured council: its members, chairman, substitutes, personalities
/// and voting strategy. Corresponds to the `Board` entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    /// Human-readable board name.
    pub name: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// 1 to 6 unified model ids that draft and rank.
    pub council_members: Vec<String>,
    /// Unified model id that synthesizes the final answer.
    pub chairman: String,
    /// `member -> substitute` pairs used when a member fails.
    #[serde(default)]
    pub substitute_models: BTreeMap<String, String>,
    /// `member -> personality text` appended to that member's system prompt.
    #[serde(default)]
    pub model_personalities: BTreeMap<String, String>,
    /// Voting strategy for Stage 2.
    #[serde(default)]
    pub consensus_strategy: ConsensusStrategy,
    /// Deadline in seconds applied to a whole stage, clamped to [10, 300].
    #[serde(default = "default_response_timeout_s")]
    pub response_timeout_s: u32,
}

fn default_response_timeout_s() -> u32 {
    60
}

impl BoardConfig {
    /// Number of council members, always within 1..=6 for a valid config.
    pub fn member_count(&self) -> usize {
        self.council_members.len()
    }

    /// Validates the invariants this type's documentation promises but serde
    /// cannot express: member count bounds and the timeout range.
    pub fn validate(&self) -> Result<(), String> {
        if self.council_members.is_empty() || self.council_members.len() > 6 {
            return Err(format!(
                "board '{}' must have between 1 and 6 council_members, got {}",
                self.name,
                self.council_members.len()
            ));
        }

        if !(10..=300).contains(&self.response_timeout_s) {
            return Err(format!(
                "board '{}' response_timeout_s must be within [10, 300], got {}",
                self.name, self.response_timeout_s
            ));
        }

        Ok(())
    }
}

/// All configured boards, keyed by board id.
pub type BoardsConfig = IndexMap<String, BoardConfig>;

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use insta::assert_debug_snapshot;

    use super::BoardConfig;

    #[test]
    fn minimal_board() {
        let toml = indoc! {r#"
            name = "General"
            council_members = ["openai/gpt-4o:openrouter", "anthropic/claude-3.5-sonnet:openrouter"]
            chairman = "anthropic/claude-3.5-sonnet:openrouter"
        "#};

        let board: BoardConfig = toml::from_str(toml).unwrap();

        assert_debug_snapshot!(&board, @r#"
        BoardConfig {
            name: "General",
            description: None,
            council_members: [
                "openai/gpt-4o:openrouter",
                "anthropic/claude-3.5-sonnet:openrouter",
            ],
            chairman: "anthropic/claude-3.5-sonnet:openrouter",
            substitute_models: {},
            model_personalities: {},
            consensus_strategy: BordaCount,
            response_timeout_s: 60,
        }
        "#);

        assert!(board.validate().is_ok());
    }

    #[test]
    fn rejects_too_many_members() {
        let toml = indoc! {r#"
            name = "Too Big"
            council_members = ["a", "b", "c", "d", "e", "f", "g"]
            chairman = "a"
        "#};

        let board: BoardConfig = toml::from_str(toml).unwrap();
        assert!(board.validate().is_err());
    }

    #[test]
    fn rejects_timeout_out_of_range() {
        let toml = indoc! {r#"
            name = "Slow"
            council_members = ["a"]
            chairman = "a"
            response_timeout_s = 5
        "#};

        let board: BoardConfig = toml::from_str(toml).unwrap();
        assert!(board.validate().is_err());
    }
}
