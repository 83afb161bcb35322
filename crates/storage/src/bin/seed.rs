use std::fmt;

use quiz_core::model::{Difficulty, Question, QuestionId};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    questions: u32,
    category: String,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidQuestions { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut questions = std::env::var("QUIZ_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(10);
        let mut category =
            std::env::var("QUIZ_CATEGORY").unwrap_or_else(|_| "general".into());

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--category" => {
                    let value = require_value(&mut args, "--category")?;
                    category = value;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            questions,
            category,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --questions <n>           Number of sample questions to upsert (default: 10)");
    eprintln!("  --category <name>         Category tag for the seeded questions (default: general)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  QUIZ_DB_URL, QUIZ_QUESTIONS, QUIZ_CATEGORY");
}

const SAMPLES: [(&str, [&str; 4], u32); 5] = [
    (
        "Which planet is closest to the sun?",
        ["Venus", "Mercury", "Mars", "Earth"],
        1,
    ),
    (
        "What is the chemical symbol for gold?",
        ["Ag", "Gd", "Au", "Go"],
        2,
    ),
    (
        "How many continents are there?",
        ["five", "six", "seven", "eight"],
        2,
    ),
    (
        "Which language has the most native speakers?",
        ["English", "Mandarin", "Spanish", "Hindi"],
        1,
    ),
    (
        "What year did the first moon landing happen?",
        ["1965", "1967", "1969", "1971"],
        2,
    ),
];

const DIFFICULTIES: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    for i in 0..args.questions {
        let (prompt, options, correct) = SAMPLES[(i as usize) % SAMPLES.len()];
        let question = Question::new(
            QuestionId::new(u64::from(i + 1)),
            prompt,
            options.iter().map(ToString::to_string).collect(),
            correct,
            args.category.clone(),
            DIFFICULTIES[(i as usize) % DIFFICULTIES.len()],
        )?;
        storage.questions.upsert_question(&question).await?;
    }

    println!(
        "Seeded {} questions (category {}) into {}",
        args.questions, args.category, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
