use anyhow::Result;
use log::warn;
use rand::seq::SliceRandom;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

mod context;
mod selection;
mod supply;

use crate::context::AppContext;
use crate::supply::question::{Difficulty, QuestionRecord};
use crate::supply::source::otdb::OtdbSource;
use crate::supply::source::QuestionSource;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let source = Arc::new(OtdbSource::new());
    if let Err(e) = source.request_token().await {
        warn!("Could not obtain a session token: {:#}", e);
    }
    let categories = source.fetch_categories().await?;

    let context = AppContext::new(source);
    context.install_catalogue(categories);
    context.current_pool().request_replenish();

    println!("quizfeed");
    println!("Commands:");
    println!("  easy / medium / hard -> switch difficulty");
    println!("  categories           -> list categories");
    println!("  toggle <id>          -> enable/disable a category");
    println!("  retry                -> retry after a network error");
    println!("  quit                 -> exit");
    println!("Anything else shows the next question.");
    println!();

    let stdin = io::stdin();
    let mut score = 0u32;
    let mut played = 0u32;

    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut input = String::new();
        if stdin.read_line(&mut input).is_err() || input.is_empty() {
            break;
        }

        match input.trim().to_lowercase().as_str() {
            "quit" | "exit" => break,
            "easy" => context.set_difficulty(Difficulty::Easy),
            "medium" => context.set_difficulty(Difficulty::Medium),
            "hard" => context.set_difficulty(Difficulty::Hard),
            "categories" => list_categories(&context),
            "retry" => context.current_pool().request_replenish(),
            command => {
                if let Some(id) = command.strip_prefix("toggle ") {
                    match id.trim().parse() {
                        Ok(id) => context.toggle_category(id),
                        Err(_) => println!("Not a category id: {}", id),
                    }
                    continue;
                }
                match next_question(&context).await {
                    Some(question) => {
                        played += 1;
                        if ask(&question, &stdin) {
                            score += 1;
                            println!("Correct! ({}/{})", score, played);
                        } else {
                            println!(
                                "Wrong, the answer was: {} ({}/{})",
                                question.correct_answer, score, played
                            );
                        }
                        println!();
                        let _ = context.current_pool().advance();
                    }
                    None => println!("No question available. Type retry to try again."),
                }
            }
        }
    }

    context.shutdown();
    println!("Final score: {}/{}", score, played);
    Ok(())
}

/// Waits for the current pool to produce a question. Gives up once nothing
/// is in flight or scheduled anymore, which is the cue to show the retry
/// affordance.
async fn next_question<S: QuestionSource>(context: &AppContext<S>) -> Option<QuestionRecord> {
    loop {
        let pool = context.current_pool();
        if let Some(question) = pool.peek() {
            return Some(question);
        }
        if let Some(error) = pool.take_last_error() {
            println!("Network error: {:#}", error);
            return None;
        }
        if !pool.is_replenishing() {
            pool.request_replenish();
            if !pool.is_replenishing() {
                return None;
            }
        }
        println!("Fetching questions...");
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

fn ask(question: &QuestionRecord, stdin: &io::Stdin) -> bool {
    let mut answers: Vec<&str> = question
        .incorrect_answers
        .iter()
        .map(String::as_str)
        .collect();
    answers.push(&question.correct_answer);
    answers.shuffle(&mut rand::thread_rng());

    println!("[{}] {}", question.category, question.prompt);
    for (index, answer) in answers.iter().enumerate() {
        println!("  {}. {}", index + 1, answer);
    }

    loop {
        print!("Answer number: ");
        io::stdout().flush().ok();
        let mut input = String::new();
        if stdin.read_line(&mut input).is_err() {
            return false;
        }
        match input.trim().parse::<usize>() {
            Ok(choice) if choice >= 1 && choice <= answers.len() => {
                return answers[choice - 1] == question.correct_answer;
            }
            _ => println!("Pick a number between 1 and {}.", answers.len()),
        }
    }
}

fn list_categories<S: QuestionSource>(context: &AppContext<S>) {
    let selection = context.selection.read();
    for category in selection.catalogue() {
        let marker = if selection.selected_category_ids().contains(&category.id) {
            "x"
        } else {
            " "
        };
        println!("  [{}] {:>3} {}", marker, category.id, category.name);
    }
}
