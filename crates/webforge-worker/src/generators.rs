// Generator selection
//
// Decision: WEBFORGE_GENERATOR picks the backend: "auto" (default) uses OpenAI
// when OPENAI_API_KEY is set and the offline scaffold otherwise; "openai"
// requires a key; "offline" never calls out.
// Decision: LLM project generation is always wrapped in a FallbackGenerator so
// a failed, empty or too slow completion still yields the scaffold.
// Decision: The primary generator's budget stays below the build's generation
// timeout, leaving room for the fallback to run.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use webforge_core::{
    BuildError, GeneratedProject, OfflineTextGenerator, ProjectGenerator, ScaffoldGenerator,
    TextGenerator,
};
use webforge_openai::{OpenAiConfig, OpenAiTextGenerator, DEFAULT_MODEL};

const DEFAULT_PRIMARY_TIMEOUT_SECS: u64 = 90;

// ============================================================================
// LlmProjectGenerator
// ============================================================================

/// Asks a text model for a JSON object mapping file paths to contents
pub struct LlmProjectGenerator {
    text: Arc<dyn TextGenerator>,
}

impl LlmProjectGenerator {
    pub fn new(text: Arc<dyn TextGenerator>) -> Self {
        Self { text }
    }

    fn instructions(prompt: &str) -> String {
        format!(
            "Create a minimal full-stack FastAPI project with HTML, CSS, and JS.\n\
             User prompt: {prompt}\n\
             Respond with a JSON object mapping file paths to file contents. \
             Do not include any text outside the JSON object."
        )
    }
}

#[async_trait]
impl ProjectGenerator for LlmProjectGenerator {
    fn name(&self) -> &str {
        self.text.name()
    }

    async fn generate(&self, prompt: &str) -> webforge_core::Result<GeneratedProject> {
        let reply = self.text.complete(&Self::instructions(prompt)).await?;
        parse_file_map(&reply)
    }
}

/// Parse a model reply into project files.
///
/// Code fences are stripped. Non-string values are kept as their JSON text.
/// Files keep the order of the reply.
pub fn parse_file_map(reply: &str) -> webforge_core::Result<GeneratedProject> {
    let body = strip_code_fences(reply);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| BuildError::generation(format!("Model reply is not valid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(BuildError::generation(
            "Model reply must be a JSON object of file paths",
        ));
    };

    let mut project = GeneratedProject::new("generated");
    for (path, content) in map {
        let content = match content {
            Value::String(text) => text,
            other => other.to_string(),
        };
        project = project.with_file(path, content);
    }
    Ok(project)
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

// ============================================================================
// FallbackGenerator
// ============================================================================

/// Tries the primary generator, then the fallback on error, empty output or
/// when the primary runs past its time budget
pub struct FallbackGenerator {
    primary: Arc<dyn ProjectGenerator>,
    fallback: Arc<dyn ProjectGenerator>,
    primary_timeout: Option<Duration>,
    name: String,
}

impl FallbackGenerator {
    pub fn new(primary: Arc<dyn ProjectGenerator>, fallback: Arc<dyn ProjectGenerator>) -> Self {
        let name = format!("{}+{}", primary.name(), fallback.name());
        Self {
            primary,
            fallback,
            primary_timeout: None,
            name,
        }
    }

    pub fn with_primary_timeout(mut self, timeout: Duration) -> Self {
        self.primary_timeout = Some(timeout);
        self
    }

    async fn try_primary(&self, prompt: &str) -> webforge_core::Result<GeneratedProject> {
        let Some(limit) = self.primary_timeout else {
            return self.primary.generate(prompt).await;
        };
        tokio::time::timeout(limit, self.primary.generate(prompt))
            .await
            .unwrap_or(Err(BuildError::Timeout(limit)))
    }
}

#[async_trait]
impl ProjectGenerator for FallbackGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> webforge_core::Result<GeneratedProject> {
        match self.try_primary(prompt).await {
            Ok(project) if !project.is_empty() => return Ok(project),
            Ok(_) => warn!(
                generator = %self.primary.name(),
                fallback = %self.fallback.name(),
                "Generator returned no files, using fallback"
            ),
            Err(e) => warn!(
                generator = %self.primary.name(),
                fallback = %self.fallback.name(),
                error = %e,
                "Generator failed, using fallback"
            ),
        }
        self.fallback.generate(prompt).await
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Which generation backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeneratorKind {
    /// OpenAI when a key is configured, offline otherwise (default)
    #[default]
    Auto,
    /// OpenAI; a missing key is an error
    OpenAi,
    /// Deterministic scaffold and canned chat replies
    Offline,
}

impl std::str::FromStr for GeneratorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(GeneratorKind::Auto),
            "openai" | "open-ai" | "open_ai" => Ok(GeneratorKind::OpenAi),
            "offline" | "scaffold" | "local" => Ok(GeneratorKind::Offline),
            _ => anyhow::bail!(
                "Unknown generator: {}. Use 'auto', 'openai' or 'offline'",
                s
            ),
        }
    }
}

/// Configuration for generation backends
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    /// Budget for the remote generator before falling back to the scaffold
    pub primary_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::Auto,
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: None,
            primary_timeout: Duration::from_secs(DEFAULT_PRIMARY_TIMEOUT_SECS),
        }
    }
}

impl GeneratorConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let kind = std::env::var("WEBFORGE_GENERATOR")
            .unwrap_or_default()
            .parse()?;
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let openai_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let openai_base_url = std::env::var("OPENAI_BASE_URL").ok();

        Ok(Self {
            kind,
            openai_api_key,
            openai_model,
            openai_base_url,
            ..Self::default()
        })
    }

    /// Shrink the primary budget to three quarters of `generation_timeout`
    /// when it would otherwise outlast the whole generation step
    pub fn fit_within(mut self, generation_timeout: Duration) -> Self {
        if self.primary_timeout >= generation_timeout {
            self.primary_timeout = generation_timeout * 3 / 4;
        }
        self
    }

    /// Config that never calls a remote model
    pub fn offline() -> Self {
        Self {
            kind: GeneratorKind::Offline,
            ..Self::default()
        }
    }

    /// API key to use, or None when the offline backend applies
    fn remote_key(&self) -> Result<Option<&str>> {
        match (self.kind, self.openai_api_key.as_deref()) {
            (GeneratorKind::Offline, _) => Ok(None),
            (GeneratorKind::OpenAi, None) => Err(BuildError::config(
                "WEBFORGE_GENERATOR=openai requires OPENAI_API_KEY",
            )
            .into()),
            (_, key) => Ok(key),
        }
    }
}

// ============================================================================
// Factories
// ============================================================================

/// Create the text generator used by chat and LLM project generation
pub fn create_text_generator(config: &GeneratorConfig) -> Result<Arc<dyn TextGenerator>> {
    let Some(api_key) = config.remote_key()? else {
        info!("Using offline text generator");
        return Ok(Arc::new(OfflineTextGenerator));
    };

    let mut openai = OpenAiConfig::new(api_key)
        .with_model(config.openai_model.clone())
        .with_request_timeout(config.primary_timeout);
    if let Some(base_url) = &config.openai_base_url {
        openai = openai.with_base_url(base_url.clone());
    }
    info!(model = %openai.model, base_url = %openai.base_url, "Using OpenAI text generator");
    Ok(Arc::new(OpenAiTextGenerator::new(openai)?))
}

/// Create the project generator used by builds
pub fn create_project_generator(
    config: &GeneratorConfig,
    text: Arc<dyn TextGenerator>,
) -> Result<Arc<dyn ProjectGenerator>> {
    let scaffold: Arc<dyn ProjectGenerator> = Arc::new(ScaffoldGenerator::new());
    if config.remote_key()?.is_none() {
        info!("Using scaffold project generator");
        return Ok(scaffold);
    }

    let generator = FallbackGenerator::new(Arc::new(LlmProjectGenerator::new(text)), scaffold)
        .with_primary_timeout(config.primary_timeout);
    info!(
        generator = %generator.name(),
        primary_timeout = ?config.primary_timeout,
        "Using LLM project generator with scaffold fallback"
    );
    Ok(Arc::new(generator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use webforge_core::memory::{FailingProjectGenerator, ScriptedTextGenerator, StaticProjectGenerator};

    #[test]
    fn test_generator_kind_from_str() {
        assert_eq!("auto".parse::<GeneratorKind>().unwrap(), GeneratorKind::Auto);
        assert_eq!("".parse::<GeneratorKind>().unwrap(), GeneratorKind::Auto);
        assert_eq!("OpenAI".parse::<GeneratorKind>().unwrap(), GeneratorKind::OpenAi);
        assert_eq!("open-ai".parse::<GeneratorKind>().unwrap(), GeneratorKind::OpenAi);
        assert_eq!("offline".parse::<GeneratorKind>().unwrap(), GeneratorKind::Offline);
        assert_eq!("scaffold".parse::<GeneratorKind>().unwrap(), GeneratorKind::Offline);
        assert!("llama".parse::<GeneratorKind>().is_err());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  ```\n{}\n```  "), "{}");
    }

    #[test]
    fn test_parse_file_map() {
        let project = parse_file_map(
            "```json\n{\"index.html\": \"<h1>x</h1>\", \"config.json\": {\"debug\": true}}\n```",
        )
        .unwrap();
        assert_eq!(project.stack, "generated");
        assert_eq!(project.len(), 2);

        let config = project.files.iter().find(|f| f.path == "config.json").unwrap();
        assert_eq!(config.content, "{\"debug\":true}");
    }

    #[test]
    fn test_parse_file_map_keeps_reply_order() {
        let project = parse_file_map(
            "{\"public/index.html\": \"<h1/>\", \"app/main.py\": \"\", \"README.md\": \"\"}",
        )
        .unwrap();
        assert_eq!(
            project.paths(),
            vec!["public/index.html", "app/main.py", "README.md"]
        );
    }

    #[test]
    fn test_parse_file_map_rejects_non_objects() {
        assert!(parse_file_map("[\"index.html\"]").is_err());
        assert!(parse_file_map("Sure! Here is your site.").is_err());
    }

    #[tokio::test]
    async fn test_llm_generator_uses_model_reply() {
        let text = ScriptedTextGenerator::new().otherwise("{\"app/main.py\": \"print(1)\"}");
        let generator = LlmProjectGenerator::new(Arc::new(text));

        let project = generator.generate("tiny api").await.unwrap();
        assert_eq!(project.paths(), vec!["app/main.py"]);
        assert_eq!(project.files[0].content, "print(1)");
    }

    #[tokio::test]
    async fn test_fallback_on_error() {
        let generator = FallbackGenerator::new(
            Arc::new(FailingProjectGenerator::new("rate limited")),
            Arc::new(ScaffoldGenerator::new()),
        );
        assert_eq!(generator.name(), "failing+scaffold");

        let project = generator.generate("cafe menu").await.unwrap();
        assert_eq!(project.stack, "scaffold");
        assert_eq!(project.len(), 5);
    }

    #[tokio::test]
    async fn test_fallback_on_empty_output() {
        let generator = FallbackGenerator::new(
            Arc::new(StaticProjectGenerator::new(GeneratedProject::new("static"))),
            Arc::new(ScaffoldGenerator::new()),
        );
        let project = generator.generate("cafe menu").await.unwrap();
        assert_eq!(project.stack, "scaffold");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_when_primary_is_too_slow() {
        let slow = StaticProjectGenerator::new(GeneratedProject::new("static").with_file("a.txt", "a"))
            .with_delay(Duration::from_secs(300));
        let generator = FallbackGenerator::new(Arc::new(slow), Arc::new(ScaffoldGenerator::new()))
            .with_primary_timeout(Duration::from_secs(5));

        let project = generator.generate("cafe menu").await.unwrap();
        assert_eq!(project.stack, "scaffold");
    }

    #[test]
    fn test_primary_budget_fits_within_generation_timeout() {
        let config = GeneratorConfig::default().fit_within(Duration::from_secs(120));
        assert_eq!(config.primary_timeout, Duration::from_secs(90));

        let config = GeneratorConfig::default().fit_within(Duration::from_secs(60));
        assert_eq!(config.primary_timeout, Duration::from_secs(45));

        let config = GeneratorConfig::default().fit_within(Duration::from_secs(90));
        assert!(config.primary_timeout < Duration::from_secs(90));
    }

    #[tokio::test]
    async fn test_primary_used_when_it_succeeds() {
        let generator = FallbackGenerator::new(
            Arc::new(StaticProjectGenerator::new(
                GeneratedProject::new("static").with_file("a.txt", "a"),
            )),
            Arc::new(ScaffoldGenerator::new()),
        );
        let project = generator.generate("x").await.unwrap();
        assert_eq!(project.stack, "static");
    }

    #[test]
    fn test_factories_without_key() {
        let config = GeneratorConfig::default();
        let text = create_text_generator(&config).unwrap();
        assert_eq!(text.name(), "offline");
        let project = create_project_generator(&config, text).unwrap();
        assert_eq!(project.name(), "scaffold");
    }

    #[test]
    fn test_openai_without_key_is_config_error() {
        let config = GeneratorConfig {
            kind: GeneratorKind::OpenAi,
            ..GeneratorConfig::default()
        };
        let err = create_text_generator(&config).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_factories_with_key() {
        let config = GeneratorConfig {
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: Some("http://localhost:9".to_string()),
            ..GeneratorConfig::default()
        };
        let text = create_text_generator(&config).unwrap();
        assert_eq!(text.name(), "openai");
        let project = create_project_generator(&config, text).unwrap();
        assert_eq!(project.name(), "openai+scaffold");
    }

    #[test]
    fn test_offline_ignores_key() {
        let config = GeneratorConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..GeneratorConfig::offline()
        };
        assert_eq!(create_text_generator(&config).unwrap().name(), "offline");
    }
}
