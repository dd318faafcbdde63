//! Knowledge lookup tool: a curated programming reference.
//!
//! Entries are matched by keyword overlap with the query and returned best
//! first. The table is small on purpose: it backs up a small local model
//! with facts it tends to get wrong.

use async_trait::async_trait;
use localagent_core::error::ToolError;
use localagent_core::tool::{Tool, ToolResult};
use serde::Serialize;

use crate::{primary_arg, tokenize};

pub struct KnowledgeLookupTool;

#[derive(Debug, Clone, Serialize)]
struct KnowledgeHit {
    topic: &'static str,
    content: &'static str,
    source: &'static str,
    score: f32,
}

struct Article {
    topic: &'static str,
    keywords: &'static [&'static str],
    content: &'static str,
    source: &'static str,
}

const ARTICLES: &[Article] = &[
    Article {
        topic: "python-typing",
        keywords: &["python", "type", "hints", "typing", "annotations", "mypy"],
        content: "Python type hints (PEP 484) annotate parameters and return values, e.g. `def f(x: int) -> str`. Use `list[int]` and `dict[str, int]` on 3.9+, `Optional[T]` or `T | None` on 3.10+. Check them with mypy or pyright; the interpreter ignores them at runtime.",
        source: "python/typing.md",
    },
    Article {
        topic: "python-exceptions",
        keywords: &["python", "exception", "exceptions", "try", "except", "raise", "error"],
        content: "Catch the narrowest exception you can handle (`except ValueError:`), never a bare `except:` which also swallows KeyboardInterrupt and SystemExit. Re-raise with `raise` to keep the traceback, or `raise NewError(...) from err` to chain.",
        source: "python/exceptions.md",
    },
    Article {
        topic: "python-testing",
        keywords: &["python", "test", "tests", "pytest", "unittest", "fixture", "mock"],
        content: "pytest discovers `test_*.py` files and `test_*` functions. Fixtures (`@pytest.fixture`) provide setup; `tmp_path` gives a temp directory; `monkeypatch` replaces attributes and env vars. Use `pytest.raises(Error)` to assert exceptions.",
        source: "python/testing.md",
    },
    Article {
        topic: "python-async",
        keywords: &["python", "async", "await", "asyncio", "coroutine", "concurrency"],
        content: "`async def` defines a coroutine; run it with `asyncio.run(main())`. Use `asyncio.gather` for concurrent awaits and `asyncio.wait_for(coro, timeout)` for timeouts. Blocking calls inside coroutines stall the event loop; move them to `asyncio.to_thread`.",
        source: "python/asyncio.md",
    },
    Article {
        topic: "rust-errors",
        keywords: &["rust", "error", "errors", "result", "unwrap", "thiserror", "anyhow"],
        content: "Rust functions that can fail return `Result<T, E>` and propagate with `?`. Libraries define error enums (commonly with `thiserror`); applications often use `anyhow::Result`. `unwrap()` and `expect()` panic on error and belong in tests or proven-infallible paths.",
        source: "rust/errors.md",
    },
    Article {
        topic: "rust-ownership",
        keywords: &["rust", "ownership", "borrow", "borrowing", "lifetime", "lifetimes", "move"],
        content: "Each Rust value has one owner; assignment moves it. References borrow without taking ownership: any number of `&T` or exactly one `&mut T` at a time. Lifetimes name how long a borrow is valid so the compiler can reject dangling references.",
        source: "rust/ownership.md",
    },
    Article {
        topic: "rust-async",
        keywords: &["rust", "async", "await", "tokio", "future", "futures", "concurrency"],
        content: "Rust `async fn` returns a Future that does nothing until polled by an executor such as tokio. Use `tokio::spawn` for concurrent tasks, `tokio::time::timeout` to bound a future, and `tokio::sync` primitives instead of std locks across `.await` points.",
        source: "rust/async.md",
    },
    Article {
        topic: "javascript-async",
        keywords: &["javascript", "js", "typescript", "promise", "promises", "async", "await"],
        content: "JavaScript `async` functions return Promises. `await` pauses until settlement; wrap in try/catch for rejections. `Promise.all` fails fast on the first rejection, `Promise.allSettled` waits for all. Unhandled rejections crash Node by default.",
        source: "javascript/async.md",
    },
    Article {
        topic: "sql-injection",
        keywords: &["sql", "injection", "query", "database", "parameterized", "security"],
        content: "Never build SQL by string concatenation with user input. Use parameterized queries (`cursor.execute(\"SELECT * FROM t WHERE id = %s\", (id,))`, `sqlx::query(...).bind(id)`). Parameters are sent separately from the statement, so input cannot change its structure.",
        source: "security/sql_injection.md",
    },
    Article {
        topic: "http-rest",
        keywords: &["http", "rest", "api", "status", "endpoint", "json", "request"],
        content: "REST APIs map resources to URLs and operations to methods: GET reads, POST creates, PUT replaces, PATCH updates, DELETE removes. Return 400 for invalid input, 404 for missing resources, 409 for conflicts and 5xx only for server faults.",
        source: "web/rest.md",
    },
    Article {
        topic: "git-workflow",
        keywords: &["git", "branch", "rebase", "merge", "commit", "conflict"],
        content: "Create a branch per change (`git switch -c feature`). `git rebase main` replays your commits on top of main for linear history; `git merge` preserves both histories. Resolve conflicts, `git add` the files, then `git rebase --continue`.",
        source: "tools/git.md",
    },
    Article {
        topic: "algorithms-complexity",
        keywords: &["algorithm", "complexity", "big", "sort", "search", "performance", "binary"],
        content: "Common complexities: hash map lookup O(1) average, binary search O(log n) on sorted data, comparison sorts O(n log n), nested loops over the same input O(n^2). Prefer a better algorithm over micro-optimizations.",
        source: "cs/complexity.md",
    },
    Article {
        topic: "react-pattern",
        keywords: &["agent", "react", "reasoning", "tools", "llm", "prompt"],
        content: "The ReAct pattern interleaves reasoning and acting: the model writes a Thought, picks an Action with an Action Input, reads the Observation, and repeats until it can give a Final Answer.",
        source: "agents/react.md",
    },
];

/// Rank articles by the share of their keywords present in the query.
fn lookup(query: &str, top_k: usize) -> Vec<KnowledgeHit> {
    let terms = tokenize(query);
    let mut hits: Vec<KnowledgeHit> = ARTICLES
        .iter()
        .filter_map(|article| {
            let matched = article
                .keywords
                .iter()
                .filter(|k| terms.iter().any(|t| t == *k))
                .count();
            (matched > 0).then(|| KnowledgeHit {
                topic: article.topic,
                content: article.content,
                source: article.source,
                score: matched as f32 / article.keywords.len() as f32,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(top_k);
    hits
}

#[async_trait]
impl Tool for KnowledgeLookupTool {
    fn name(&self) -> &str {
        "knowledge_lookup"
    }

    fn description(&self) -> &str {
        "Look up programming reference material (Python, Rust, JavaScript, SQL, HTTP, git, algorithms). \
         Input: a short search query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look up"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default 2)",
                    "default": 2
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = primary_arg(&arguments, "query")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let top_k = arguments["top_k"].as_u64().unwrap_or(2).clamp(1, 5) as usize;
        let hits = lookup(query, top_k);

        if hits.is_empty() {
            return Ok(ToolResult::text(format!(
                "No reference material found for '{query}'."
            )));
        }

        let output = hits
            .iter()
            .map(|h| format!("[{}] {}", h.source, h.content))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolResult {
            success: true,
            output,
            data: serde_json::to_value(&hits).ok(),
        })
    }
}
