use beehive_domain::{RatingSubject, ReviewOutcome, WorkId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct UsageError(String);

impl UsageError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login {
        email: String,
    },
    Logout,
    Status,
    Load {
        work: Option<WorkId>,
    },
    Start,
    Skip,
    Analyze {
        solution_url: String,
    },
    Submit {
        solution_url: Option<String>,
        decision: Option<ReviewOutcome>,
        ratings: Vec<(RatingSubject, u8)>,
    },
    Feedback {
        text: String,
    },
    Cancel,
    Watch,
    Review {
        code: String,
    },
    Help,
}

pub fn parse_command(args: impl IntoIterator<Item = String>) -> Result<Command, UsageError> {
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(Command::Help);
    };

    let command = match command.as_str() {
        "login" => Command::Login {
            email: required_value(&mut args, "login", "<email>")?,
        },
        "logout" => Command::Logout,
        "status" => Command::Status,
        "load" => {
            let mut work = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--work" => {
                        work = Some(WorkId::new(required_value(&mut args, "--work", "<id>")?));
                    }
                    other => return Err(unexpected(other)),
                }
            }
            return Ok(Command::Load { work });
        }
        "start" => Command::Start,
        "skip" => Command::Skip,
        "analyze" => Command::Analyze {
            solution_url: required_value(&mut args, "analyze", "<pull-request-url>")?,
        },
        "submit" => return parse_submit(args),
        "feedback" => {
            let text = args.by_ref().collect::<Vec<_>>().join(" ");
            if text.trim().is_empty() {
                return Err(UsageError::new(
                    "Missing value after feedback. Use feedback <text>.",
                ));
            }
            return Ok(Command::Feedback { text });
        }
        "cancel" => Command::Cancel,
        "watch" => Command::Watch,
        "review" => Command::Review {
            code: required_value(&mut args, "review", "<code>")?,
        },
        "help" | "--help" | "-h" => Command::Help,
        other => {
            return Err(UsageError::new(format!(
                "Unknown command '{other}'. Run with --help for valid commands."
            )))
        }
    };

    match args.next() {
        Some(extra) => Err(unexpected(&extra)),
        None => Ok(command),
    }
}

fn parse_submit(args: impl Iterator<Item = String>) -> Result<Command, UsageError> {
    let mut args = args;
    let mut solution_url = None;
    let mut decision = None;
    let mut ratings = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--approve" => decision = Some(ReviewOutcome::Approve),
            "--request-modifications" => decision = Some(ReviewOutcome::RequestModifications),
            "--rate" => {
                let value = required_value(&mut args, "--rate", "<subject>=<score>")?;
                ratings.push(parse_rating(&value)?);
            }
            flag if flag.starts_with("--") => {
                return Err(UsageError::new(format!(
                    "Unknown flag '{flag}'. Run with --help for valid flags."
                )));
            }
            url if solution_url.is_none() => solution_url = Some(url.to_owned()),
            other => return Err(unexpected(other)),
        }
    }

    Ok(Command::Submit {
        solution_url,
        decision,
        ratings,
    })
}

fn parse_rating(value: &str) -> Result<(RatingSubject, u8), UsageError> {
    let (subject, score) = value.split_once('=').ok_or_else(|| {
        UsageError::new(format!(
            "Invalid rating '{value}'. Use --rate <subject>=<score>."
        ))
    })?;
    let subject = subject
        .parse::<RatingSubject>()
        .map_err(|error| UsageError::new(error.to_string()))?;
    let score = score
        .trim()
        .parse::<u8>()
        .map_err(|_| UsageError::new(format!("Rating score '{score}' must be between 1 and 5.")))?;
    Ok((subject, score))
}

fn required_value(
    args: &mut impl Iterator<Item = String>,
    after: &str,
    placeholder: &str,
) -> Result<String, UsageError> {
    args.next()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            UsageError::new(format!(
                "Missing value after {after}. Use {after} {placeholder}."
            ))
        })
}

fn unexpected(argument: &str) -> UsageError {
    UsageError::new(format!(
        "Unexpected argument '{argument}'. Run with --help for valid commands."
    ))
}

pub fn print_help() {
    println!("Usage: beehive <command>");
    println!();
    println!("  login <email>                     Sign in; the password is read from BEEHIVE_PASSWORD");
    println!("  logout                            Forget the stored tokens");
    println!("  status                            Show the current work item and deadline");
    println!("  load [--work <id>]                Load the next item, or a specific one");
    println!("  start                             Activate the offered item");
    println!("  skip                              Skip the offered item and load another");
    println!("  analyze <url>                     Request automated analysis of a pull request");
    println!("  submit [<url>] [--approve|--request-modifications] [--rate <subject>=<score>]...");
    println!("                                    Finish the active item");
    println!("  feedback <text>                   Report a problem instead of a solution");
    println!("  cancel                            Abandon the active item");
    println!("  watch                             Follow the deadline and checkpoint until interrupted");
    println!("  review <code>                     Resolve a rating code to its review page");
}
