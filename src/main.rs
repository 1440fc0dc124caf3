use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    booking::{arrange_rows, render_text, BookingFlow, FlowUpdate, NoticeOutcome, SeatState, Toggle},
    models::{ComboId, MovieId, ShowtimeId, TheaterId, UserId},
    Config,
};

#[derive(Parser)]
#[command(name = "cinema-booking", about = "Cinema seat booking from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Theaters screening the movie on a date
    Theaters {
        #[arg(long)]
        movie: MovieId,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Showtimes of the movie in a theater on a date
    Showtimes {
        #[arg(long)]
        movie: MovieId,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        theater: TheaterId,
    },
    /// Seat map of a showtime, optionally following live seat locks
    Seats {
        #[command(flatten)]
        target: ShowtimeArgs,
        /// Keep listening for seat locks for this many seconds
        #[arg(long)]
        watch: Option<u64>,
    },
    /// Select seats and combos, then create the payment
    Book {
        #[command(flatten)]
        target: ShowtimeArgs,
        #[arg(long)]
        user: UserId,
        /// Seat code, e.g. A5 or A7-A8; repeatable
        #[arg(long = "seat", required = true)]
        seats: Vec<String>,
        /// Combo as ID=QUANTITY; repeatable
        #[arg(long = "combo", value_parser = parse_combo)]
        combos: Vec<(ComboId, u32)>,
        #[arg(long)]
        method: Option<String>,
    },
}

#[derive(Args)]
struct ShowtimeArgs {
    #[arg(long)]
    movie: MovieId,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    theater: TheaterId,
    #[arg(long)]
    showtime: ShowtimeId,
}

fn parse_combo(raw: &str) -> Result<(ComboId, u32), String> {
    let (id, quantity) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=QUANTITY, got {raw:?}"))?;
    let id = id.trim().parse().map_err(|_| format!("bad combo id {id:?}"))?;
    let quantity = quantity
        .trim()
        .parse()
        .map_err(|_| format!("bad quantity {quantity:?}"))?;
    Ok((id, quantity))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(environment = %config.app.environment, api = %config.backend.api_base_url, "Starting booking client");

    match Cli::parse().command {
        Command::Theaters { movie, date } => {
            let mut flow = BookingFlow::new(&config, movie, None)?;
            flow.choose_date(date);
            flow.settle().await;
            report_notice(&flow);
            for theater in flow.session().theaters() {
                println!("{:>6}  {}", theater.id, theater.name);
            }
        }
        Command::Showtimes {
            movie,
            date,
            theater,
        } => {
            let mut flow = BookingFlow::new(&config, movie, None)?;
            flow.choose_date(date);
            flow.settle().await;
            flow.choose_theater(theater);
            flow.settle().await;
            report_notice(&flow);
            for showtime in flow.session().showtimes() {
                println!(
                    "{:>6}  {} - {}  {}",
                    showtime.id,
                    showtime.start_time.format("%H:%M"),
                    showtime.end_time.format("%H:%M"),
                    showtime.room_name
                );
            }
        }
        Command::Seats { target, watch } => {
            let mut flow = open_showtime(&config, &target, None).await?;
            print_seat_map(&flow);

            if let Some(seconds) = watch {
                let deadline = tokio::time::sleep(Duration::from_secs(seconds));
                tokio::pin!(deadline);
                loop {
                    tokio::select! {
                        _ = &mut deadline => break,
                        update = flow.next_update() => {
                            if let FlowUpdate::Lock(NoticeOutcome::Merged(merge)) = update {
                                if !merge.newly_locked.is_empty() {
                                    println!("Locked by another customer: {:?}", merge.newly_locked);
                                    print_seat_map(&flow);
                                }
                            }
                        }
                    }
                }
            }
            flow.leave_showtime();
        }
        Command::Book {
            target,
            user,
            seats,
            combos,
            method,
        } => {
            let mut flow = open_showtime(&config, &target, Some(user)).await?;

            for code in &seats {
                let Some(seat_id) = flow.session().seat_map().seat_by_code(code).map(|s| s.id) else {
                    bail!("seat {code} does not exist in this showtime");
                };
                match flow.toggle_seat(seat_id) {
                    Toggle::Selected => {}
                    Toggle::Ignored(SeatState::LockedByOther) => bail!("seat {code} is held by another customer"),
                    other => bail!("seat {code} cannot be selected ({other:?})"),
                }
            }
            for (combo_id, quantity) in combos {
                flow.session_mut().cart_mut().set(combo_id, quantity);
            }

            print_seat_map(&flow);
            match flow.submit(method.as_deref()).await {
                Ok(url) => println!("Continue payment at: {url}"),
                Err(e) => {
                    warn!("Booking failed: {}", e);
                    bail!(e.user_message());
                }
            }
            flow.leave_showtime();
        }
    }

    Ok(())
}

async fn open_showtime(
    config: &Config,
    target: &ShowtimeArgs,
    user: Option<UserId>,
) -> anyhow::Result<BookingFlow> {
    let mut flow = BookingFlow::new(config, target.movie, user)?;
    flow.start();
    flow.choose_date(target.date);
    flow.settle().await;
    flow.choose_theater(target.theater);
    flow.settle().await;
    flow.choose_showtime(target.showtime);
    flow.settle().await;

    if flow.session().seat_map().is_empty() {
        report_notice(&flow);
        bail!("no seats for showtime {}", target.showtime);
    }
    Ok(flow)
}

fn report_notice(flow: &BookingFlow) {
    if let Some(notice) = flow.session().notice() {
        println!("{notice}");
    }
}

fn print_seat_map(flow: &BookingFlow) {
    let session = flow.session();
    if let Some(movie) = session.movie() {
        println!("{}", movie.title);
    }
    if let Some(showtime) = session.selected_showtime() {
        println!(
            "{} {} - {}",
            showtime.room_name,
            showtime.start_time.format("%Y-%m-%d %H:%M"),
            showtime.end_time.format("%H:%M")
        );
    }

    let seat_map = session.seat_map();
    let rows = arrange_rows(seat_map.seats());
    print!(
        "{}",
        render_text(&rows, |id| seat_map.state(id).unwrap_or(SeatState::Unavailable))
    );

    let price = session.price();
    if price.discounted_total < price.total {
        println!(
            "Total: {} (was {}, -{}%)",
            price.discounted_total, price.total, price.discount_percent
        );
    } else {
        println!("Total: {}", price.total);
    }
}
