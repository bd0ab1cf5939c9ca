//! Practice question commands.

use super::{format_date, open, runtime};
use anyhow::Result;
use colored::Colorize;
use edulens_core::Question;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn generate(topic_id: &str, name: Option<String>) -> Result<()> {
    let app = open()?;
    let topic = app.service.find_topic(topic_id)?;
    let name = name.unwrap_or_else(|| topic.name.clone());

    let rt = runtime()?;
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Writing questions about {}", name));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = rt.block_on(
        app.service
            .generate_questions(&topic.id, &name, &topic.artifact_id),
    );
    pb.finish_and_clear();
    let questions = result?;

    if questions.is_empty() {
        println!(
            "{} No questions could be generated right now. Try again later.",
            "Note:".yellow().bold()
        );
        return Ok(());
    }

    println!(
        "{} {} questions for {}",
        "Generated".green().bold(),
        questions.len(),
        name.white().bold()
    );
    println!("{}", "─".repeat(70));
    for (i, question) in questions.iter().enumerate() {
        print_question(i + 1, question, true);
    }

    Ok(())
}

pub fn list(topic_id: &str, show_answers: bool) -> Result<()> {
    let app = open()?;
    let topic = app.service.find_topic(topic_id)?;
    let questions = app.service.list_questions(&topic.id)?;

    println!("{} {}", "Questions for".cyan().bold(), topic.name.white().bold());
    println!("{}", "─".repeat(70));

    if questions.is_empty() {
        println!(
            "{}",
            "No questions yet. Use 'edulens questions generate <topic-id>'.".dimmed()
        );
        return Ok(());
    }

    let mut batch = None;
    for (i, question) in questions.iter().enumerate() {
        let stamp = format_date(&app.config, &question.created_at);
        if batch.as_ref() != Some(&stamp) {
            println!();
            println!("{}", stamp.dimmed());
            batch = Some(stamp);
        }
        print_question(i + 1, question, show_answers);
    }

    Ok(())
}

fn print_question(number: usize, question: &Question, show_answer: bool) {
    println!(
        "{:>3}. {} {}",
        number,
        question.text,
        format!(
            "({}, {})",
            question.question_type.as_str(),
            question.difficulty.as_str()
        )
        .dimmed()
    );
    if let Some(options) = &question.options {
        for (letter, option) in ('A'..='Z').zip(options) {
            println!("       {}) {}", letter, option);
        }
    }
    if show_answer {
        println!("       {} {}", "Answer:".green(), question.answer);
    }
}
