use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dialoguer::{Confirm, Input, Password};
use url::Url;

mod error;
mod ics;
mod notes;
mod session;
mod timetable;

use error::{Error, Result};
use session::cache::{FileCache, NoCache, PageCache};
use session::CateSession;

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Args {
    /// CATe username, defaults to the one encoded in the page URL
    #[clap(short, long, value_name = "USERNAME")]
    user: Option<String>,

    /// Always refetch pages instead of reusing previously fetched ones
    #[clap(long)]
    no_cache: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the exercise timetable, or export it to iCalendar
    Timetable {
        /// URL of the timetable page
        url: String,

        /// Export to iCalendar format (.ics)
        #[clap(short, long, value_name = "FILE NAME")]
        export: Option<String>,

        /// Year of study to keep in the export
        #[clap(short, long, default_value_t = 3)]
        level: u8,
    },

    /// List notes of a course, or download a selection of them
    Notes {
        /// URL of the notes page
        url: String,

        /// Notes to download, i.e. 1-10 or 12; nothing means list only
        ranges: Vec<String>,

        /// Folder to save the downloaded files
        #[clap(short, long, default_value = ".")]
        output: PathBuf,

        /// Name format of the downloaded files, i.e. {number} {title}.{filetype}
        #[clap(short, long)]
        format: Option<String>,

        /// Automatic yes to prompts
        #[clap(short = 'y', long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let raw_url = match &args.command {
        Command::Timetable { url, .. } | Command::Notes { url, .. } => url.clone(),
    };
    let (url, url_user) = cate_url(&raw_url)?;

    let username = match args.user.or(url_user) {
        Some(user) => user,
        None => Input::new().with_prompt("CATe username").interact_text()?,
    };

    let cache: Box<dyn PageCache + Send + Sync> = if args.no_cache {
        Box::new(NoCache)
    } else {
        Box::new(FileCache::new(std::env::temp_dir().join("catextor")))
    };

    let mut session = CateSession::new(username, String::new(), cache)?;
    request_auth(&mut session).await?;

    match args.command {
        Command::Timetable { export, level, .. } => {
            println!("Fetching the timetable...");
            let timetable = timetable::timetable(&session, url.as_str()).await?;

            if let Some(mut filename) = export {
                ics::export(&timetable, level, &mut filename)?;
                println!(".ICS file built and exported => {filename}");
            } else {
                timetable::display(&timetable);
            }
        }

        Command::Notes {
            ranges,
            output,
            format,
            yes,
            ..
        } => {
            let notes = notes::notes(&session, url.as_str()).await?;
            let selected = parse_ranges(&ranges)?;

            if selected.is_empty() {
                for entry in notes.values() {
                    println!("{entry}");
                }
                return Ok(());
            }

            println!("The following marked with a (*) will be downloaded:");
            let mut count = 0;
            for (number, entry) in &notes {
                if selected.contains(number) {
                    count += 1;
                    println!("  * {entry}");
                } else {
                    println!("    {entry}");
                }
            }
            println!("{count} out of {} selected", notes.len());

            if !proceed(yes)? {
                println!("Notes not downloaded.");
                return Ok(());
            }

            let mut seen = HashSet::new();
            for number in selected {
                if !seen.insert(number) {
                    continue;
                }
                if let Some(entry) = notes.get(&number) {
                    entry.download(&session, &output, format.as_deref()).await?;
                }
            }
        }
    }

    Ok(())
}

/// Keep prompting until the password passes the portal's auth check
async fn request_auth(session: &mut CateSession) -> Result<()> {
    loop {
        let password = Password::new()
            .with_prompt(format!("Password for [{}]", session.username()))
            .interact()?;

        if session.password_correct(&password).await? {
            session.set_password(password);
            return Ok(());
        }

        println!("Password incorrect. Try again.");
    }
}

fn proceed(assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    Ok(Confirm::new().with_prompt("Proceed?").interact()?)
}

/// Check that the URL really points at CATe and pull the username out
/// of its `key` parameter when there is one
fn cate_url(raw: &str) -> Result<(Url, Option<String>)> {
    let url = Url::parse(raw).map_err(|_| Error::BadUrl(raw.to_owned()))?;

    if url.host_str() != Some("cate.doc.ic.ac.uk") {
        return Err(Error::BadUrl(raw.to_owned()));
    }

    let key = url
        .query_pairs()
        .find(|(name, _)| name == "key")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::BadUrl(raw.to_owned()))?;

    // The key ends with ":username"
    let user = key
        .rsplit_once(':')
        .map(|(_, user)| user.to_owned())
        .filter(|user| !user.is_empty());

    Ok((url, user))
}

/// Expand `1-10 12`-style arguments in the order given, bounds inclusive
fn parse_ranges(ranges: &[String]) -> Result<Vec<u32>> {
    let mut selected = Vec::new();

    for range in ranges {
        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (start, end),
            None => (range.as_str(), range.as_str()),
        };

        match (start.parse::<u32>(), end.parse::<u32>()) {
            (Ok(start), Ok(end)) if start <= end => selected.extend(start..=end),
            _ => return Err(Error::BadRange(range.clone())),
        }
    }

    Ok(selected)
}
