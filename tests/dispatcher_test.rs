//! Integration tests for the batch dispatcher

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use promptbatch::core::{
    combine_prompts, list_input_files, resolve_sources, DispatchOptions, Dispatcher, InputFile,
};
use promptbatch::models::{Config, GenerationParams, TaskState};

mod common;

use common::{create_input, create_prompt, create_test_project, output_files, read_output, MockClient};

fn options(root: &Path, timeout: Duration) -> DispatchOptions {
    DispatchOptions {
        max_concurrent: 4,
        timeout,
        output_dir: root.join("output"),
        output_extension: "txt".to_string(),
    }
}

#[tokio::test]
async fn test_slow_call_times_out_alone() {
    let (_temp_dir, root) = create_test_project();
    let prompt_path = create_prompt(&root, "p.txt", "Summarize:");
    create_input(&root, "fast.txt", "quick");
    create_input(&root, "slow.txt", "sluggish");

    let prompt = combine_prompts(&resolve_sources(&[prompt_path], &root).unwrap()).unwrap();
    let files = list_input_files(&root.join("input"), &["txt".to_string()]).unwrap();
    let params = GenerationParams::from_config(&Config::default());

    let client = Arc::new(MockClient::new().delay_on("sluggish", Duration::from_secs(30)));
    let dispatcher = Dispatcher::new(client.clone(), options(&root, Duration::from_millis(200)));
    let summary = dispatcher.run(&prompt, &params, files).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    let failure = summary.failures().next().unwrap();
    assert_eq!(failure.input_name(), "slow.txt");
    assert!(failure.error().unwrap().contains("timeout"));
    assert_eq!(output_files(&root), vec!["fast.txt"]);
}

#[tokio::test]
async fn test_results_are_terminal_and_sorted() {
    let (_temp_dir, root) = create_test_project();
    let prompt_path = create_prompt(&root, "p.txt", "Summarize:");
    for name in ["c.txt", "a.txt", "b.txt"] {
        create_input(&root, name, name);
    }

    let prompt = combine_prompts(&resolve_sources(&[prompt_path], &root).unwrap()).unwrap();
    let files = list_input_files(&root.join("input"), &[]).unwrap();
    let params = GenerationParams::from_config(&Config::default());

    let client = Arc::new(MockClient::new().with_delay(Duration::from_millis(5)));
    let dispatcher = Dispatcher::new(client, options(&root, Duration::from_secs(5)));
    let summary = dispatcher.run(&prompt, &params, files).await;

    let names: Vec<String> = summary.results.iter().map(|r| r.input_name()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    assert!(summary.results.iter().all(|r| r.state().is_terminal()));
    assert!(summary.results.iter().all(|r| r.state() == TaskState::Succeeded));
    assert!(summary.finished_at.is_some());
}

#[tokio::test]
async fn test_no_files_no_calls() {
    let (_temp_dir, root) = create_test_project();
    let prompt_path = create_prompt(&root, "p.txt", "Summarize:");
    let prompt = combine_prompts(&resolve_sources(&[prompt_path], &root).unwrap()).unwrap();
    let params = GenerationParams::from_config(&Config::default());

    let client = Arc::new(MockClient::new());
    let dispatcher = Dispatcher::new(client.clone(), options(&root, Duration::from_secs(5)));
    let summary = dispatcher.run(&prompt, &params, Vec::new()).await;

    assert_eq!(summary.total(), 0);
    assert!(summary.is_success());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_unsorted_files_keep_name_order_on_collision() {
    let (_temp_dir, root) = create_test_project();
    let prompt_path = create_prompt(&root, "p.txt", "Summarize:");
    let text = create_input(&root, "a.txt", "text");
    let markdown = create_input(&root, "a.md", "markdown");

    let prompt = combine_prompts(&resolve_sources(&[prompt_path], &root).unwrap()).unwrap();
    let params = GenerationParams::from_config(&Config::default());
    let files = vec![InputFile::new(text), InputFile::new(markdown)];

    let client = Arc::new(MockClient::new());
    let dispatcher = Dispatcher::new(client.clone(), options(&root, Duration::from_secs(5)));
    let summary = dispatcher.run(&prompt, &params, files).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(client.call_count(), 1);
    assert_eq!(summary.failures().next().unwrap().input_name(), "a.txt");
    assert_eq!(read_output(&root, "a.txt"), "<summary of markdown>");
}
