//! Job template rendering — the fixed vocabulary in `SPEC_FULL.md` §3.
//!
//! Template rendering is pure string substitution: no control flow, no
//! conditionals. The scheduler's own template engine (out of scope) handles
//! everything past the JSON the cluster driver submits.

use std::collections::BTreeMap;

/// The kind of job being submitted, matching spec.md §4.2's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Train,
    Deploy,
    Datagen,
    LlmDispatch,
}

impl JobKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Deploy => "deploy",
            Self::Datagen => "datagen",
            Self::LlmDispatch => "llm-dispatch",
        }
    }
}

/// The substitution values for one job template render.
///
/// `env_overrides` is a `BTreeMap` rather than a `HashMap` so that rendering
/// is deterministic and the resulting template is hashable/comparable in
/// tests (`SPEC_FULL.md` §3).
#[derive(Debug, Clone)]
pub struct JobSubstitutions {
    pub job_kind: JobKind,
    pub model_id: String,
    pub deployment_id: String,
    pub alloc_id: String,
    pub docker_image: String,
    pub docker_registry: String,
    pub bazaar_dir: String,
    pub memory_mb: u32,
    pub cpu_cores: u32,
    pub gpu_count: u32,
    pub autoscaling_enabled: bool,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub callback_base_url: String,
    pub task_runner_token: String,
    pub env_overrides: BTreeMap<String, String>,
}

/// A raw job spec template containing `{{key}}` placeholders for every field
/// of [`JobSubstitutions`] plus arbitrary `{{env.KEY}}` placeholders for
/// `env_overrides`.
#[derive(Debug, Clone)]
pub struct JobTemplate {
    raw: String,
}

impl JobTemplate {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Render this template into the canonical job spec string, substituting
    /// every known placeholder.
    ///
    /// Unknown `{{...}}` keys left over after substitution are a programming
    /// error per §4.2 ("unknown keys are a programming error") — not a
    /// recoverable `Result`, since the template vocabulary is fixed and
    /// known at compile time.
    #[must_use]
    pub fn render(&self, values: &JobSubstitutions) -> String {
        let mut rendered = self
            .raw
            .replace("{{job_kind}}", values.job_kind.as_str())
            .replace("{{model_id}}", &values.model_id)
            .replace("{{deployment_id}}", &values.deployment_id)
            .replace("{{alloc_id}}", &values.alloc_id)
            .replace("{{docker_image}}", &values.docker_image)
            .replace("{{docker_registry}}", &values.docker_registry)
            .replace("{{bazaar_dir}}", &values.bazaar_dir)
            .replace("{{memory_mb}}", &values.memory_mb.to_string())
            .replace("{{cpu_cores}}", &values.cpu_cores.to_string())
            .replace("{{gpu_count}}", &values.gpu_count.to_string())
            .replace(
                "{{autoscaling_enabled}}",
                &values.autoscaling_enabled.to_string(),
            )
            .replace("{{min_replicas}}", &values.min_replicas.to_string())
            .replace("{{max_replicas}}", &values.max_replicas.to_string())
            .replace("{{callback_base_url}}", &values.callback_base_url)
            .replace("{{task_runner_token}}", &values.task_runner_token);

        for (key, value) in &values.env_overrides {
            rendered = rendered.replace(&format!("{{{{env.{key}}}}}"), value);
        }

        debug_assert!(
            !rendered.contains("{{") || rendered.contains("{{env."),
            "job template left an unknown placeholder unsubstituted: {rendered}"
        );

        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_every_known_field() {
        let template = JobTemplate::new(
            r#"{"kind":"{{job_kind}}","model":"{{model_id}}","mem":{{memory_mb}}}"#,
        );
        let values = JobSubstitutions {
            job_kind: JobKind::Train,
            model_id: "m1".to_owned(),
            deployment_id: "d1".to_owned(),
            alloc_id: "a1".to_owned(),
            docker_image: "img".to_owned(),
            docker_registry: "registry".to_owned(),
            bazaar_dir: "/bazaar".to_owned(),
            memory_mb: 2048,
            cpu_cores: 2,
            gpu_count: 0,
            autoscaling_enabled: false,
            min_replicas: 1,
            max_replicas: 1,
            callback_base_url: "https://cp.example".to_owned(),
            task_runner_token: "tok".to_owned(),
            env_overrides: BTreeMap::new(),
        };

        let out = template.render(&values);
        assert_eq!(out, r#"{"kind":"train","model":"m1","mem":2048}"#);
    }

    #[test]
    fn env_overrides_render_deterministically() {
        let template = JobTemplate::new("{{env.A}}-{{env.B}}");
        let mut env_overrides = BTreeMap::new();
        env_overrides.insert("B".to_owned(), "2".to_owned());
        env_overrides.insert("A".to_owned(), "1".to_owned());

        let values = JobSubstitutions {
            job_kind: JobKind::Deploy,
            model_id: String::new(),
            deployment_id: String::new(),
            alloc_id: String::new(),
            docker_image: String::new(),
            docker_registry: String::new(),
            bazaar_dir: String::new(),
            memory_mb: 0,
            cpu_cores: 0,
            gpu_count: 0,
            autoscaling_enabled: false,
            min_replicas: 0,
            max_replicas: 0,
            callback_base_url: String::new(),
            task_runner_token: String::new(),
            env_overrides,
        };

        assert_eq!(template.render(&values), "1-2");
    }
}
