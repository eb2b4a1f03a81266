use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};

use playground::config::save_config;
use playground::conversation::{Conversation, Message, MessageId};
use playground::session::compare::CompareReplies;
use playground::session::history::default_export_path;
use playground::session::{PlaygroundSession, Side, TurnOutcome};
use playground::Playground;

const HELP: &str = "\
commands:
  <text>                      send a message
  /compare, /single           enter or leave compare mode
  /sync left|right            overwrite that side with a copy of the other
  /move left|right            move that side's messages onto the other
  /clear [left|right]         clear the main transcript or one side
  /model <id> [left|right]    switch model
  /system [left|right] <text> set the system message
  /show [left|right]          print a transcript with message ids
  /delete <id> [left|right]   remove a message
  /dislike <id> [left|right]  toggle the dislike flag
  /json <id> [left|right]     toggle the JSON view of a message
  /attach <id> <function> [left|right]
                              attach a function definition to an assistant turn
  /respond <id> [left|right] <text>
                              set the simulated function response
  /call <id> [left|right]     send the function result and get the next answer
  /gen-system <prompt>        generate a system message
  /gen-function <description> generate and store a function definition
  /functions                  list function definitions (loads examples if empty)
  /code [left|right]          show the request payload
  /models                     list available models
  /history                    show the history log
  /export [path]              write the history log as JSON
  /save                       write the main model and system message to the config file
  /help, /quit";

#[derive(Debug, PartialEq)]
enum Command {
    Send(String),
    Compare,
    Single,
    Sync(Side),
    Move(Side),
    Clear(Option<Side>),
    Model(String, Option<Side>),
    System(Option<Side>, String),
    Show(Option<Side>),
    Delete(MessageId, Option<Side>),
    Dislike(MessageId, Option<Side>),
    Json(MessageId, Option<Side>),
    Attach(MessageId, String, Option<Side>),
    Respond(MessageId, Option<Side>, String),
    Call(MessageId, Option<Side>),
    GenerateSystem(String),
    GenerateFunction(String),
    Functions,
    Code(Option<Side>),
    Models,
    History,
    Export(Option<PathBuf>),
    Save,
    Help,
    Quit,
}

fn parse_side(arg: Option<&str>) -> Result<Option<Side>, String> {
    arg.map(str::parse::<Side>).transpose()
}

/// Splits a leading `left`/`right` word off free text.
fn leading_side(args: &str) -> (Option<Side>, &str) {
    let (first, rest) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    match first {
        "left" => (Some(Side::Left), rest.trim_start()),
        "right" => (Some(Side::Right), rest.trim_start()),
        _ => (None, args),
    }
}

fn parse_id(word: Option<&str>, usage: &str) -> Result<MessageId, String> {
    let word = word.ok_or(usage)?;
    word.parse().map_err(|_| format!("'{word}' is not a message id; {usage}"))
}

fn parse_command(line: &str) -> Result<Command, String> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Send(line.to_string()));
    };
    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    let mut words = args.split_whitespace();

    let command = match name {
        "compare" => Command::Compare,
        "single" => Command::Single,
        "sync" => Command::Sync(parse_side(words.next())?.ok_or("usage: /sync left|right")?),
        "move" => Command::Move(parse_side(words.next())?.ok_or("usage: /move left|right")?),
        "clear" => Command::Clear(parse_side(words.next())?),
        "model" => {
            let model = words.next().ok_or("usage: /model <id> [left|right]")?;
            Command::Model(model.to_string(), parse_side(words.next())?)
        }
        "system" => {
            let (side, text) = leading_side(args);
            Command::System(side, text.to_string())
        }
        "show" => Command::Show(parse_side(words.next())?),
        "delete" => {
            let id = parse_id(words.next(), "usage: /delete <id> [left|right]")?;
            Command::Delete(id, parse_side(words.next())?)
        }
        "dislike" => {
            let id = parse_id(words.next(), "usage: /dislike <id> [left|right]")?;
            Command::Dislike(id, parse_side(words.next())?)
        }
        "json" => {
            let id = parse_id(words.next(), "usage: /json <id> [left|right]")?;
            Command::Json(id, parse_side(words.next())?)
        }
        "attach" => {
            const USAGE: &str = "usage: /attach <id> <function> [left|right]";
            let id = parse_id(words.next(), USAGE)?;
            let mut name: Vec<&str> = words.collect();
            let side = match name.last() {
                Some(&"left") => Some(Side::Left),
                Some(&"right") => Some(Side::Right),
                _ => None,
            };
            if side.is_some() {
                name.pop();
            }
            if name.is_empty() {
                return Err(USAGE.to_string());
            }
            Command::Attach(id, name.join(" "), side)
        }
        "respond" => {
            let (id, rest) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
            let id = parse_id((!id.is_empty()).then_some(id), "usage: /respond <id> [left|right] <text>")?;
            let (side, text) = leading_side(rest.trim_start());
            Command::Respond(id, side, text.to_string())
        }
        "call" => {
            let id = parse_id(words.next(), "usage: /call <id> [left|right]")?;
            Command::Call(id, parse_side(words.next())?)
        }
        "gen-system" => Command::GenerateSystem(args.to_string()),
        "gen-function" => Command::GenerateFunction(args.to_string()),
        "functions" => Command::Functions,
        "code" => Command::Code(parse_side(words.next())?),
        "models" => Command::Models,
        "history" => Command::History,
        "export" => Command::Export((!args.is_empty()).then(|| PathBuf::from(args))),
        "save" => Command::Save,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '/{other}', try /help")),
    };
    Ok(command)
}

fn print_transcript(label: &str, conversation: &Conversation) {
    println!("--- {label} ({} messages)", conversation.len());
    for message in conversation.messages() {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    println!("[{}] {}: {}", message.id, message.role(), message.content);
}

fn print_replies(replies: &CompareReplies) {
    for (side, reply) in [(Side::Left, &replies.left), (Side::Right, &replies.right)] {
        match reply {
            Some(message) => println!("({side}) {}", message.content),
            None => println!("({side}) <discarded>"),
        }
    }
}

fn print_usage(session: &PlaygroundSession) {
    if let Some(usage) = &session.main().last_usage {
        println!(
            "  {} ms, {} prompt / {} completion tokens, id {}",
            usage.elapsed_ms, usage.prompt_tokens, usage.completion_tokens, usage.request_id
        );
    }
}

/// Applies `edit` to the conversation of the column picked by `side`.
fn edit_message(
    session: &mut PlaygroundSession,
    side: Option<Side>,
    id: MessageId,
    edit: impl FnOnce(&mut Conversation) -> bool,
) -> Result<(), String> {
    let column = session.column_mut(side).ok_or("not in compare mode")?;
    if !edit(&mut column.conversation) {
        return Err(format!("no matching message {id}"));
    }
    if let Some(message) = column.conversation.get(id) {
        print_message(message);
    }
    Ok(())
}

async fn run_command(app: &mut Playground, command: Command) -> Result<(), String> {
    let session = &mut app.session;
    match command {
        Command::Send(text) => match session.send(&text).await {
            TurnOutcome::Ignored => {}
            TurnOutcome::Single(Some(reply)) => {
                print_message(&reply);
                print_usage(session);
            }
            TurnOutcome::Single(None) => println!("<discarded>"),
            TurnOutcome::Compare(replies) => print_replies(&replies),
        },
        Command::Compare => {
            let cmp = session.enter_compare();
            println!(
                "compare mode: left={} right={}",
                cmp.left().sampling.model,
                cmp.right().sampling.model
            );
        }
        Command::Single => {
            if session.exit_compare().is_none() {
                println!("not in compare mode");
            }
        }
        Command::Sync(target) => {
            let cmp = session.compare_mut().ok_or("not in compare mode")?;
            cmp.sync(target);
            print_transcript(target.as_str(), &cmp.column(target).conversation);
        }
        Command::Move(from) => {
            let cmp = session.compare_mut().ok_or("not in compare mode")?;
            cmp.move_from(from);
            let to = from.other();
            print_transcript(to.as_str(), &cmp.column(to).conversation);
        }
        Command::Clear(None) => session.clear(),
        Command::Clear(Some(side)) => session.compare_mut().ok_or("not in compare mode")?.clear(side),
        Command::Model(model, side) => {
            let column = session.column_mut(side).ok_or("not in compare mode")?;
            column.sampling.model = model;
        }
        Command::System(side, text) => {
            session.column_mut(side).ok_or("not in compare mode")?.system_message = text;
        }
        Command::Show(side) => {
            let label = side.map_or("main", |s| s.as_str());
            let column = session.column_mut(side).ok_or("not in compare mode")?;
            print_transcript(label, &column.conversation);
        }
        Command::Delete(id, side) => edit_message(session, side, id, |c| c.remove(id))?,
        Command::Dislike(id, side) => edit_message(session, side, id, |c| c.toggle_dislike(id))?,
        Command::Json(id, side) => edit_message(session, side, id, |c| c.toggle_json_view(id))?,
        Command::Attach(id, name, side) => {
            if !session.attach_function(side, id, &name) {
                return Err(format!("cannot attach '{name}' to {id}; see /functions and /show"));
            }
            println!("attached {name} to {id}");
        }
        Command::Respond(id, side, text) => {
            edit_message(session, side, id, |c| c.update_function_response(id, &text))?;
        }
        Command::Call(id, side) => match session.send_function_result(side, id).await {
            Some(reply) => print_message(&reply),
            None => println!("nothing sent; attach a function to {id} first"),
        },
        Command::GenerateSystem(prompt) => match session.generate_system_message(&prompt).await {
            Ok(Some(text)) => println!("system message: {text}"),
            Ok(None) => println!("nothing to generate"),
            Err(e) => return Err(e.to_string()),
        },
        Command::GenerateFunction(description) => match session.generate_function(&description).await {
            Ok(Some(function)) => println!("added {}\n{}", function.name, function.json_definition),
            Ok(None) => println!("nothing to generate"),
            Err(e) => return Err(e.to_string()),
        },
        Command::Functions => {
            if session.main().functions.is_empty() {
                session.load_examples().map_err(|e| e.to_string())?;
            }
            for function in session.main().functions.iter() {
                println!("{}", function.name);
            }
        }
        Command::Code(side) => {
            let column = session.column_mut(side).ok_or("not in compare mode")?;
            let code = serde_json::to_string_pretty(&column.code_snapshot()).map_err(|e| e.to_string())?;
            println!("{code}");
        }
        Command::Models => {
            let list = session.list_models().await.map_err(|e| e.to_string())?;
            for model in list.data {
                println!("{}", model.id);
            }
        }
        Command::History => {
            for (day, entries) in session.history().grouped_by_date() {
                println!("{day}");
                for entry in entries {
                    println!("  {} {}", entry.ts.with_timezone(&chrono::Local).format("%H:%M"), entry.summary());
                }
            }
        }
        Command::Export(path) => {
            let path = path.unwrap_or_else(default_export_path);
            session.history().export_to(&path).map_err(|e| e.to_string())?;
            println!("history written to {}", path.display());
        }
        Command::Save => {
            app.config.sampling = app.session.main().sampling.clone();
            app.config.session.system_message = app.session.main().system_message.clone();
            save_config(&app.config).map_err(|e| e.to_string())?;
            println!("settings saved");
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    playground::init_tracing();

    let mut app = match playground::bootstrap() {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "failed to start");
            std::process::exit(1);
        }
    };
    tracing::info!(
        active = app.registry.active_name(),
        providers = ?app.registry.list_names(),
        "playground ready"
    );
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "failed to read stdin");
                break;
            }
        };
        let command = match parse_command(line.trim_end()) {
            Ok(command) => command,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(msg) = run_command(&mut app, command).await {
            println!("error: {msg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_send() {
        assert_eq!(parse_command("hello there").unwrap(), Command::Send("hello there".into()));
    }

    #[test]
    fn parses_side_arguments() {
        assert_eq!(parse_command("/sync left").unwrap(), Command::Sync(Side::Left));
        assert_eq!(parse_command("/move right").unwrap(), Command::Move(Side::Right));
        assert_eq!(parse_command("/clear").unwrap(), Command::Clear(None));
        assert_eq!(
            parse_command("/model o1-mini right").unwrap(),
            Command::Model("o1-mini".into(), Some(Side::Right))
        );
        assert!(parse_command("/sync").is_err());
        assert!(parse_command("/clear middle").is_err());
    }

    #[test]
    fn keeps_free_text_arguments() {
        assert_eq!(
            parse_command("/system You are a pirate.").unwrap(),
            Command::System(None, "You are a pirate.".into())
        );
        assert_eq!(
            parse_command("/system right Answer in French.").unwrap(),
            Command::System(Some(Side::Right), "Answer in French.".into())
        );
        assert_eq!(
            parse_command("/system leftover text").unwrap(),
            Command::System(None, "leftover text".into())
        );
        assert_eq!(parse_command("/save").unwrap(), Command::Save);
        assert_eq!(parse_command("/export").unwrap(), Command::Export(None));
        assert!(parse_command("/bogus").is_err());
    }

    fn id(n: &str) -> MessageId {
        n.parse().unwrap()
    }

    #[test]
    fn parses_message_commands() {
        assert_eq!(parse_command("/show left").unwrap(), Command::Show(Some(Side::Left)));
        assert_eq!(parse_command("/delete 17").unwrap(), Command::Delete(id("17"), None));
        assert_eq!(
            parse_command("/dislike 17 right").unwrap(),
            Command::Dislike(id("17"), Some(Side::Right))
        );
        assert_eq!(parse_command("/json 17").unwrap(), Command::Json(id("17"), None));
        assert!(parse_command("/delete").is_err());
        assert!(parse_command("/json seventeen").is_err());
        assert!(parse_command("/dislike 17 middle").is_err());
    }

    #[test]
    fn parses_function_call_commands() {
        assert_eq!(
            parse_command("/attach 42 get_weather").unwrap(),
            Command::Attach(id("42"), "get_weather".into(), None)
        );
        assert_eq!(
            parse_command("/attach 42 Unnamed Function left").unwrap(),
            Command::Attach(id("42"), "Unnamed Function".into(), Some(Side::Left))
        );
        assert!(parse_command("/attach 42").is_err());
        assert!(parse_command("/attach 42 right").is_err());

        assert_eq!(
            parse_command(r#"/respond 42 {"temp": 21}"#).unwrap(),
            Command::Respond(id("42"), None, r#"{"temp": 21}"#.into())
        );
        assert_eq!(
            parse_command("/respond 42 right sunny").unwrap(),
            Command::Respond(id("42"), Some(Side::Right), "sunny".into())
        );
        assert_eq!(parse_command("/respond 42").unwrap(), Command::Respond(id("42"), None, String::new()));
        assert!(parse_command("/respond").is_err());

        assert_eq!(parse_command("/call 42").unwrap(), Command::Call(id("42"), None));
        assert_eq!(parse_command("/call 42 left").unwrap(), Command::Call(id("42"), Some(Side::Left)));
    }
}
