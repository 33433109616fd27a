use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use lectern_core::indexing;
use lectern_core::{Answer, Config, Quiz, QuizConfig, QuizGenerator, RagError, Session};
use lectern_index::BuildReport;
use lectern_llm::LlmProvider;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn build(
    mut config: Config,
    corpus: Option<PathBuf>,
    index: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(dir) = corpus {
        config.corpus.dir = dir;
    }
    if let Some(path) = index {
        config.index.path = path;
    }

    let report = indexing::build(&config).await.with_context(|| {
        format!(
            "failed to build index from {}",
            config.corpus.dir.display()
        )
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&report));
    }
    Ok(())
}

pub async fn ask(
    config: &Config,
    question: Option<String>,
    top_k: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let session = Session::open(config)
        .await
        .context("failed to open session")?;

    if let Some(question) = question {
        let answer = answer(&session, &question, top_k).await?;
        print_answer(&answer, json)?;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        match answer(&session, question, top_k).await {
            Ok(answer) => print_answer(&answer, json)?,
            Err(e) => {
                tracing::error!(question, "question failed: {e:#}");
                eprintln!("error: {e}");
            }
        }
    }
    Ok(())
}

pub async fn quiz(config: &Config, topic: &str, count: usize, json: bool) -> anyhow::Result<()> {
    let session = Session::open(config)
        .await
        .context("failed to open session")?;
    let quiz = QuizGenerator::new(&session, QuizConfig::from(config))
        .generate(topic, count)
        .await
        .with_context(|| format!("failed to generate quiz on {topic:?}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&quiz)?);
    } else {
        println!("{}", render_quiz(&quiz));
    }
    Ok(())
}

/// Ask with the configured or overridden `k`; an empty retrieval becomes the
/// "not found" answer instead of an error.
async fn answer<E: LlmProvider, G: LlmProvider>(
    session: &Session<E, G>,
    question: &str,
    top_k: Option<i64>,
) -> Result<Answer, RagError> {
    let result = match top_k {
        Some(k) => session.ask_k(question, k).await,
        None => session.ask(question).await,
    };
    match result {
        Err(RagError::EmptyContext) => Ok(Answer::not_found(question)),
        other => other,
    }
}

fn print_answer(answer: &Answer, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(answer)?);
    } else {
        println!("{}", render_answer(answer));
    }
    Ok(())
}

fn render_report(report: &BuildReport) -> String {
    format!(
        "Indexed {} documents ({} pages) into {} chunks of dimension {}\nIndex written to {}",
        report.documents,
        report.pages,
        report.chunks,
        report.dimension,
        report.index_dir.display()
    )
}

fn render_answer(answer: &Answer) -> String {
    let mut out = answer.answer.clone();
    if answer.sources.is_empty() {
        return out;
    }
    out.push_str("\n\nSources:");
    for (i, citation) in answer.sources.iter().enumerate() {
        let _ = write!(
            out,
            "\n[{}] {} - Page {}\n    {}",
            i + 1,
            citation.source,
            citation.page,
            citation.content.replace('\n', " ")
        );
    }
    out
}

fn render_quiz(quiz: &Quiz) -> String {
    let mut out = format!("Quiz: {}", quiz.topic.to_uppercase());
    if quiz.fallback {
        out.push_str("\n(placeholder questions, the model reply could not be parsed)");
    }
    for (i, mcq) in quiz.questions.iter().enumerate() {
        let o = &mcq.options;
        let _ = write!(
            out,
            "\n\nQuestion {}: {}\n  A) {}\n  B) {}\n  C) {}\n  D) {}\nCorrect answer: {}\nExplanation: {}",
            i + 1,
            mcq.question,
            o.a,
            o.b,
            o.c,
            o.d,
            mcq.correct_answer,
            mcq.explanation
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lectern_core::SessionConfig;
    use lectern_core::composer::{Citation, NOT_FOUND_ANSWER};
    use lectern_core::fallback_quiz;
    use lectern_index::{Chunk, IndexError, Metric, RetrievalConfig, VectorIndex};
    use lectern_llm::mock::MockProvider;

    use super::*;

    fn ready_session(
        embedder: MockProvider,
        generator: MockProvider,
        min_score: Option<f32>,
    ) -> Session<MockProvider, MockProvider> {
        let chunks = vec![
            Chunk {
                text: "Pooling downsamples feature maps.".into(),
                source: "course_materials/lecture07.pdf".into(),
                page: 3,
                chunk_index: 0,
            },
            Chunk {
                text: "Dropout randomly zeroes activations.".into(),
                source: "course_materials/lecture05.pdf".into(),
                page: 2,
                chunk_index: 0,
            },
        ];
        let index =
            VectorIndex::build(chunks, vec![vec![1.0, 0.0], vec![0.0, 1.0]], Metric::Cosine)
                .unwrap();
        let config = SessionConfig {
            retrieval: RetrievalConfig {
                min_score,
                ..RetrievalConfig::default()
            },
            ..SessionConfig::default()
        };
        let mut session = Session::new(Arc::new(embedder), Arc::new(generator), config);
        session.initialize(Arc::new(index));
        session
    }

    #[tokio::test]
    async fn empty_retrieval_becomes_not_found_answer() {
        let embedder = MockProvider::default().with_default_embedding(vec![-1.0, -1.0]);
        let session = ready_session(embedder, MockProvider::default(), Some(0.5));

        let answer = answer(&session, "What is a transformer?", None).await.unwrap();
        assert_eq!(answer.answer, NOT_FOUND_ANSWER);
        assert!(answer.context_free);
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn top_k_override_limits_sources() {
        let embedder = MockProvider::default().with_default_embedding(vec![1.0, 0.2]);
        let generator = MockProvider::with_responses(vec!["Pooling shrinks maps.".into()]);
        let session = ready_session(embedder, generator, None);

        let answer = answer(&session, "What is pooling?", Some(1)).await.unwrap();
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].source, "lecture07.pdf");
    }

    #[tokio::test]
    async fn generation_failure_is_reported() {
        let embedder = MockProvider::default().with_default_embedding(vec![1.0, 0.0]);
        let session = ready_session(embedder, MockProvider::failing(), None);

        let err = answer(&session, "q", None).await.unwrap_err();
        assert!(matches!(err, RagError::GenerationUnavailable(_)));
        let err = answer(&session, "q", Some(0)).await.unwrap_err();
        assert!(matches!(err, RagError::Index(IndexError::InvalidK(0))));
    }

    #[test]
    fn answer_lists_numbered_sources() {
        let answer = Answer {
            question: "What is pooling?".into(),
            answer: "Pooling downsamples.".into(),
            sources: vec![Citation {
                content: "Pooling downsamples\nfeature maps.".into(),
                source: "lecture07.pdf".into(),
                page: 3,
            }],
            context_free: false,
        };
        let text = render_answer(&answer);
        assert!(text.starts_with("Pooling downsamples.\n\nSources:"));
        assert!(text.contains("[1] lecture07.pdf - Page 3\n    Pooling downsamples feature maps."));
    }

    #[test]
    fn not_found_answer_has_no_sources_section() {
        let text = render_answer(&Answer::not_found("q"));
        assert_eq!(text, NOT_FOUND_ANSWER);
    }

    #[test]
    fn fallback_quiz_is_flagged() {
        let quiz = Quiz {
            topic: "cnns".into(),
            questions: fallback_quiz("cnns", 2),
            fallback: true,
        };
        let text = render_quiz(&quiz);
        assert!(text.starts_with("Quiz: CNNS\n(placeholder questions"));
        assert!(text.contains("Question 2: What is a key concept in cnns?"));
        assert!(text.contains("  D) Option D\nCorrect answer: A"));
    }

    #[test]
    fn report_names_index_dir() {
        let report = BuildReport {
            documents: 2,
            pages: 5,
            chunks: 9,
            dimension: 384,
            index_dir: PathBuf::from("vectordb"),
        };
        assert_eq!(
            render_report(&report),
            "Indexed 2 documents (5 pages) into 9 chunks of dimension 384\nIndex written to vectordb"
        );
    }
}
