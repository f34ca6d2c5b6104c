use async_trait::async_trait;
use llmkit::client_wrapper::{
    ChatOptions, ChatResponse, ClientError, ClientResult, ClientWrapper, Message, NoopSink,
};
use llmkit::event::{EventHandler, ResearchEvent};
use llmkit::research::{
    ResearchConfig, ResearchRunner, ResearchStore, StepType, SYNTHESIS_QUERY,
};
use llmkit::search::{PageContent, SearchError, SearchHit, SearchOptions, SearchProvider, SearchResult};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Answers by request kind, told apart by sampling temperature.
struct ScriptedResearchClient {
    queries_reply: String,
    fail_analysis: bool,
    analysis_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedResearchClient {
    fn new(queries_reply: &str) -> Self {
        Self {
            queries_reply: queries_reply.to_string(),
            fail_analysis: false,
            analysis_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ClientWrapper for ScriptedResearchClient {
    fn model_name(&self) -> &str {
        "mock-research"
    }

    async fn send_message(
        &self,
        messages: &[Message],
        options: &ChatOptions,
    ) -> ClientResult<ChatResponse> {
        let prompt = messages[0].content.as_text();
        self.prompts.lock().unwrap().push(prompt);
        let content = match options.temperature {
            Some(t) if (t - 0.6).abs() < 1e-6 => self.queries_reply.clone(),
            Some(t) if (t - 0.3).abs() < 1e-6 => {
                let n = self.analysis_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if self.fail_analysis {
                    return Err(Box::new(ClientError::Api {
                        status: 500,
                        body: "boom".into(),
                    }));
                }
                format!("analysis #{} {}", n, "x".repeat(600))
            }
            _ => "## 执行摘要\nfinal".to_string(),
        };
        Ok(ChatResponse {
            content,
            reasoning: "thinking".into(),
            usage: None,
        })
    }
}

struct ScriptedSearch {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, options: &SearchOptions) -> SearchResult<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Box::new(SearchError::Transport("offline".into())));
        }
        assert!(options.with_text);
        Ok(vec![SearchHit {
            title: format!("Paper on {}", query),
            url: "https://arxiv.org/abs/1".into(),
            content: "abstract".into(),
            score: 0.87,
            ..Default::default()
        }])
    }

    async fn contents(&self, url: &str, _: usize) -> SearchResult<PageContent> {
        Err(Box::new(SearchError::NoContent(url.to_string())))
    }
}

#[derive(Default)]
struct ProgressLog {
    progress: Mutex<Vec<f32>>,
    saved: Mutex<Option<String>>,
}

#[async_trait]
impl EventHandler for ProgressLog {
    async fn on_research_event(&self, event: &ResearchEvent) {
        match event {
            ResearchEvent::StepCompleted { progress, .. }
            | ResearchEvent::SynthesisStarted { progress, .. }
            | ResearchEvent::SynthesisCompleted { progress } => self.progress.lock().unwrap().push(*progress),
            ResearchEvent::Saved { filename } => *self.saved.lock().unwrap() = Some(filename.clone()),
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_full_run_is_saved_and_reloadable() {
    let tmp = TempDir::new().unwrap();
    let client = Arc::new(ScriptedResearchClient::new(r#"{"queries": ["q1", "q2"]}"#));
    let search = Arc::new(ScriptedSearch {
        fail: false,
        calls: AtomicUsize::new(0),
    });
    let events = Arc::new(ProgressLog::default());
    let store = ResearchStore::new(tmp.path());

    let runner = ResearchRunner::new(client.clone(), search.clone())
        .with_config(ResearchConfig::default().with_depth(2).with_queries_per_depth(2))
        .with_store(store.clone())
        .with_event_handler(events.clone());

    let report = runner.run("固态电池", &NoopSink).await.unwrap();

    // 2 levels x 2 queries + synthesis
    assert_eq!(report.steps.len(), 5);
    assert_eq!(search.calls.load(Ordering::SeqCst), 4);
    let synthesis = report.synthesis().unwrap();
    assert_eq!(synthesis.query, SYNTHESIS_QUERY);
    assert_eq!(synthesis.step_type, StepType::Synthesis);
    assert!(synthesis.sources.is_empty());
    assert!(!report.session_id.is_empty());

    let progress = events.progress.lock().unwrap().clone();
    assert_eq!(progress.len(), 6);
    assert!((progress[0] - 0.2).abs() < 1e-6);
    assert!(progress[..4].iter().all(|p| *p <= 0.95));
    assert!((progress[4] - 0.96).abs() < 1e-6);
    assert!((progress[5] - 1.0).abs() < 1e-6);

    let filename = report.filename.clone().unwrap();
    assert!(filename.ends_with("_research.json"));
    assert_eq!(events.saved.lock().unwrap().as_deref(), Some(filename.as_str()));

    let (query, steps) = store.load(&filename).unwrap();
    assert_eq!(query, "固态电池");
    assert_eq!(steps, report.steps);
    assert_eq!(store.list(10).unwrap(), vec![filename.clone()]);
    let record = store.load_record(&filename).unwrap();
    assert_eq!(record.session_id.as_deref(), Some(report.session_id.as_str()));
    assert!(!record.timestamp.is_empty());

    let markdown = report.to_markdown();
    assert!(markdown.contains("(相关度: 0.87)"));
    assert!(markdown.contains("## 步骤 4: q2"));
}

#[tokio::test]
async fn test_running_context_is_passed_to_later_analyses() {
    let client = Arc::new(ScriptedResearchClient::new(r#"{"queries": ["first", "second"]}"#));
    let search = Arc::new(ScriptedSearch {
        fail: false,
        calls: AtomicUsize::new(0),
    });
    let runner = ResearchRunner::new(client.clone(), search)
        .with_config(ResearchConfig::default().with_depth(1).with_queries_per_depth(2));
    runner.run("topic", &NoopSink).await.unwrap();

    let prompts = client.prompts.lock().unwrap();
    // query generation, analysis(first), analysis(second), synthesis
    assert_eq!(prompts.len(), 4);
    let second_analysis = &prompts[2];
    assert!(second_analysis.contains("\nfirst: analysis #1 "));
    assert!(second_analysis.contains("...\n"));
    assert!(prompts[3].contains("=== first ==="));
}

#[tokio::test]
async fn test_failures_degrade_gracefully() {
    let mut client = ScriptedResearchClient::new("not json at all");
    client.fail_analysis = true;
    let client = Arc::new(client);
    let search = Arc::new(ScriptedSearch {
        fail: true,
        calls: AtomicUsize::new(0),
    });
    let runner = ResearchRunner::new(client, search)
        .with_config(ResearchConfig::default().with_depth(1));

    let report = runner.run("main question", &NoopSink).await.unwrap();
    assert!(report.filename.is_none());
    assert_eq!(report.steps.len(), 2);

    let step = &report.steps[0];
    assert_eq!(step.query, "main question");
    assert!(step.sources.is_empty());
    assert!(step.analysis.starts_with("分析失败: "));
    assert!(step.reasoning.is_empty());
}

#[tokio::test]
async fn test_query_generation_falls_back_on_transport_error() {
    struct Down;

    #[async_trait]
    impl ClientWrapper for Down {
        fn model_name(&self) -> &str {
            "down"
        }

        async fn send_message(&self, _: &[Message], _: &ChatOptions) -> ClientResult<ChatResponse> {
            Err(Box::new(ClientError::Transport("refused".into())))
        }
    }

    let runner = ResearchRunner::new(
        Arc::new(Down),
        Arc::new(ScriptedSearch {
            fail: false,
            calls: AtomicUsize::new(0),
        }),
    );
    let queries = runner.generate_search_queries("x", &[], 1).await;
    assert_eq!(queries, vec!["x".to_string()]);

    let (synthesis, reasoning) = runner.synthesize("x", &[], &NoopSink).await;
    assert!(synthesis.starts_with("综合分析失败: "));
    assert!(reasoning.is_empty());
}

#[tokio::test]
async fn test_failed_synthesis_is_saved_as_final_step() {
    struct SynthesisDown;

    #[async_trait]
    impl ClientWrapper for SynthesisDown {
        fn model_name(&self) -> &str {
            "synthesis-down"
        }

        async fn send_message(&self, _: &[Message], options: &ChatOptions) -> ClientResult<ChatResponse> {
            match options.temperature {
                Some(t) if (t - 0.2).abs() < 1e-6 => Err(Box::new(ClientError::Api {
                    status: 503,
                    body: "overloaded".into(),
                })),
                Some(t) if (t - 0.6).abs() < 1e-6 => Ok(ChatResponse {
                    content: r#"{"queries": ["only"]}"#.into(),
                    ..Default::default()
                }),
                _ => Ok(ChatResponse {
                    content: "analysis".into(),
                    ..Default::default()
                }),
            }
        }
    }

    let tmp = TempDir::new().unwrap();
    let store = ResearchStore::new(tmp.path());
    let runner = ResearchRunner::new(
        Arc::new(SynthesisDown),
        Arc::new(ScriptedSearch {
            fail: false,
            calls: AtomicUsize::new(0),
        }),
    )
    .with_config(ResearchConfig::default().with_depth(1).with_queries_per_depth(1))
    .with_store(store.clone());

    let report = runner.run("topic", &NoopSink).await.unwrap();
    let synthesis = report.synthesis().unwrap();
    assert!(synthesis.analysis.starts_with("综合分析失败: "), "{}", synthesis.analysis);
    assert!(synthesis.reasoning.is_empty());

    let (_, steps) = store.load(report.filename.as_deref().unwrap()).unwrap();
    assert_eq!(steps.last().unwrap().analysis, synthesis.analysis);
}

#[test]
fn test_load_accepts_record_with_only_query_and_steps() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("0101_0900_research.json"),
        r#"{"query": "q", "steps": [{"query": "s1", "step_type": "search_analysis"}]}"#,
    )
    .unwrap();
    fs::write(tmp.path().join("0102_0900_research.json"), r#"{"query": "empty", "steps": []}"#).unwrap();

    let store = ResearchStore::new(tmp.path());
    let (query, steps) = store.load("0101_0900_research.json").unwrap();
    assert_eq!(query, "q");
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step_type, StepType::SearchAnalysis);
    assert!(steps[0].analysis.is_empty());
    assert!(steps[0].sources.is_empty());

    let record = store.load_record("0102_0900_research.json").unwrap();
    assert!(record.timestamp.is_empty());
    assert!(record.session_id.is_none());
    assert!(record.steps.is_empty());
}
