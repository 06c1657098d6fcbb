use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use dapps_game::{
    AppSnapshot,
    advisory::Severity,
    controller::{
        ActionKind,
        ActionStatus,
        Freshness,
    },
    forms::{
        InputEdit,
        InputField,
    },
    session::SessionPhase,
    stats::{
        MAX_PLAYERS_PER_MACHINE,
        MachineSlot,
    },
    units,
};
use futures::StreamExt;
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use tokio::sync::mpsc;
use tracing::warn;
use unicode_width::UnicodeWidthStr;

const GAME_RULES: [&str; 7] = [
    "Each game machine has a hidden target amount.",
    "Players place bets (0-10,000 DGT) on a machine.",
    "The player whose bet makes the machine reach or exceed the target wins the prize.",
    "The prize equals the target amount.",
    "Players can play multiple times on the same machine but cannot play on multiple machines simultaneously.",
    "Each machine can have a maximum of 10 players.",
    "Machines reset once a winner is determined.",
];

const HELP: &str = "c connect | Tab next field | 0-9 . type | Enter submit | ←/→ machine | r refresh | x dismiss | q/Esc quit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Connect,
    BuyTokens,
    SellTokens,
    PlaceBet,
    Refresh,
    DismissAdvisory,
    Edit(InputField, InputEdit),
    SelectMachine(MachineSlot),
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<Event>;

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    focus: InputField,
    selected_machine: MachineSlot,
    /// Whether the last drawn snapshot allowed a bet.
    bet_submittable: bool,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            focus: InputField::EthAmount,
            selected_machine: MachineSlot::default(),
            bet_submittable: false,
            terminal: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

/// Reads terminal events on a background task so waiting for the next one
/// can be raced against chain work without losing input.
pub fn spawn_input_reader() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "terminal input failed");
                    break;
                }
            }
        }
    });
    rx
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    state.selected_machine = snap.inputs.selected_machine;
    state.bet_submittable = snap.bet_submittable;
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub async fn next_event(
    state: &mut UiState,
    events: &mut InputEventReceiver,
) -> Result<UserEvent> {
    loop {
        let Some(event) = events.recv().await else {
            return Ok(UserEvent::Quit);
        };
        if let Event::Key(key) = event {
            if let Some(user_event) = handle_key(state, key) {
                return Ok(user_event);
            }
        }
    }
}

fn handle_key(state: &mut UiState, key: KeyEvent) -> Option<UserEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    if state.mode == Mode::QuitModal {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Enter => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('c') => Some(UserEvent::Connect),
        KeyCode::Char('r') => Some(UserEvent::Refresh),
        KeyCode::Char('x') => Some(UserEvent::DismissAdvisory),
        KeyCode::Tab => {
            state.focus = state.focus.next();
            Some(UserEvent::Redraw)
        }
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
            Some(UserEvent::Edit(state.focus, InputEdit::Push(c)))
        }
        KeyCode::Backspace => Some(UserEvent::Edit(state.focus, InputEdit::Backspace)),
        KeyCode::Delete => Some(UserEvent::Edit(state.focus, InputEdit::Clear)),
        KeyCode::Left | KeyCode::Char('h') => {
            Some(UserEvent::SelectMachine(state.selected_machine.prev()))
        }
        KeyCode::Right | KeyCode::Char('l') => {
            Some(UserEvent::SelectMachine(state.selected_machine.next()))
        }
        KeyCode::Enter => match state.focus {
            InputField::EthAmount => Some(UserEvent::BuyTokens),
            InputField::SellAmount => Some(UserEvent::SellTokens),
            InputField::BetAmount if state.bet_submittable => Some(UserEvent::PlaceBet),
            InputField::BetAmount => None,
        },
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // title
            Constraint::Length(3),  // advisory
            Constraint::Length(5),  // wallet
            Constraint::Length(10), // trade + machines
            Constraint::Length(9),  // rules
            Constraint::Length(3),  // help
        ])
        .split(f.area());

    draw_title(f, chunks[0], snap);
    draw_advisory(f, chunks[1], snap);
    draw_wallet_panel(f, chunks[2], snap);
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[3]);
    draw_trade_panel(f, state, middle[0], snap);
    draw_machines_panel(f, state, middle[1], snap);
    draw_rules(f, chunks[4]);
    let help = Paragraph::new(HELP).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[5]);

    if state.mode == Mode::QuitModal {
        let area = centered_rect(40, 20, f.area());
        f.render_widget(Clear, area);
        let modal = Paragraph::new("Quit DApps Game? (y/n)")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Quit"));
        f.render_widget(modal, area);
    }
}

fn draw_title(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let network = snap.network.as_deref().unwrap_or("-");
    let text = format!("Network: {} | Game contract: {}", network, snap.game_address);
    let widget = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                "DApps Game",
                Style::default().add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(widget, area);
}

fn draw_advisory(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let (text, color) = match (&snap.advisory, &snap.pending) {
        (Some(advisory), _) => (advisory.message.clone(), severity_color(advisory.severity)),
        (None, Some(pending)) => (pending_label(pending.kind, pending.status), Color::Cyan),
        (None, None) => (String::from("Ready"), Color::Gray),
    };
    let widget = Paragraph::new(text)
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(widget, area);
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Warning => Color::Yellow,
        Severity::Success => Color::Green,
        Severity::Danger => Color::Red,
    }
}

fn pending_label(kind: ActionKind, status: ActionStatus) -> String {
    let action = match kind {
        ActionKind::Connect => String::from("Connecting wallet"),
        ActionKind::Buy => String::from("Buying tokens"),
        ActionKind::Sell => String::from("Selling tokens"),
        ActionKind::Bet { machine } => format!("Betting on {machine}"),
        ActionKind::Refresh => String::from("Refreshing"),
    };
    let step = match status {
        ActionStatus::Validating => "checking",
        ActionStatus::AwaitingApproval => "waiting for approval",
        ActionStatus::AwaitingConfirmation => "waiting for confirmation",
        ActionStatus::Refreshing => "updating balance",
    };
    format!("{action}: {step}...")
}

fn draw_wallet_panel(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let lines = if !snap.wallet_available {
        vec![Line::styled(
            "No wallet provider. Restart with --simulated to play locally.",
            Style::default().fg(Color::Yellow),
        )]
    } else {
        match (snap.phase, snap.account) {
            (SessionPhase::Connected, Some(account)) => {
                let freshness = match snap.balance.freshness {
                    Freshness::Stale => " (may be outdated, press r)",
                    Freshness::Unknown => " (unknown)",
                    Freshness::Fresh => "",
                };
                vec![
                    Line::from(format!("Account: {}", account.short())),
                    Line::from(format!(
                        "Balance: {} DGT{}",
                        units::format_fixed(snap.balance.raw, units::TOKEN_DECIMALS, 2),
                        freshness
                    )),
                    Line::styled(
                        format!("Exact: {}", snap.balance.display()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]
            }
            (SessionPhase::Connecting, _) => vec![Line::from("Connecting...")],
            (SessionPhase::Rebinding, _) => vec![Line::from("Wallet changed, reloading...")],
            _ => vec![Line::from("Not connected. Press c to connect your wallet.")],
        }
    };
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn input_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let shown = if value.is_empty() { "_" } else { value };
    let style = if focused {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let marker = if focused { "> " } else { "  " };
    Line::styled(format!("{marker}{label}: {shown}"), style)
}

fn draw_trade_panel(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let lines = vec![
        input_line(
            "Buy with ETH",
            &snap.inputs.eth_amount,
            state.focus == InputField::EthAmount,
        ),
        Line::styled(
            format!("    You'll receive {} DGT", snap.buy_preview),
            Style::default().fg(Color::DarkGray),
        ),
        Line::from(""),
        input_line(
            "Sell DGT",
            &snap.inputs.sell_amount,
            state.focus == InputField::SellAmount,
        ),
        Line::styled(
            format!("    You'll receive {} ETH", snap.sell_preview),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Buy / Sell DGT"));
    f.render_widget(widget, area);
}

fn machine_line(slot: MachineSlot, snap: &AppSnapshot, width: usize) -> Line<'static> {
    let stat = snap.machines[slot.index()];
    let availability = if stat.occupied_elsewhere {
        ("Not available - playing on another machine", Color::Red)
    } else if snap.current_machine == slot.number() {
        ("Your machine", Color::Green)
    } else if stat.is_full() {
        ("Full", Color::Red)
    } else {
        ("Available to play", Color::Green)
    };
    let selected = slot == snap.inputs.selected_machine;
    let name = format!("{}{}", if selected { "> " } else { "  " }, slot);
    let players = format!("Players: {}/{}", stat.player_count, MAX_PLAYERS_PER_MACHINE);
    let left = [name.as_str(), players.as_str()].iter().join("  ");
    let pad = width.saturating_sub(left.width() + availability.0.width()).max(1);
    let name_style = if selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(left, name_style),
        Span::raw(" ".repeat(pad)),
        Span::styled(availability.0, Style::default().fg(availability.1)),
    ])
}

fn draw_machines_panel(f: &mut Frame, state: &UiState, area: Rect, snap: &AppSnapshot) {
    let block = Block::default().borders(Borders::ALL).title("Game Machines");
    let width = block.inner(area).width as usize;
    let mut lines: Vec<Line> = MachineSlot::all()
        .into_iter()
        .map(|slot| machine_line(slot, snap, width))
        .collect();
    lines.push(Line::from(""));
    lines.push(input_line(
        &format!(
            "Bet on {} (max {} DGT)",
            snap.inputs.selected_machine,
            units::format_fixed(snap.bet_ceiling, units::TOKEN_DECIMALS, 2)
        ),
        &snap.inputs.bet_amount,
        state.focus == InputField::BetAmount,
    ));
    let (hint, color) = if snap.bet_submittable {
        ("    Enter to place bet", Color::Green)
    } else {
        ("    Bet unavailable", Color::DarkGray)
    };
    lines.push(Line::styled(hint, Style::default().fg(color)));
    let widget = Paragraph::new(lines).block(block);
    f.render_widget(widget, area);
}

fn draw_rules(f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = GAME_RULES
        .iter()
        .enumerate()
        .map(|(i, rule)| Line::from(format!("{}. {}", i + 1, rule)))
        .collect();
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Game Rules"));
    f.render_widget(widget, area);
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn handle_key__enter_submits_focused_form() {
        // given
        let mut state = UiState {
            bet_submittable: true,
            ..UiState::default()
        };
        handle_key(&mut state, press(KeyCode::Tab));
        handle_key(&mut state, press(KeyCode::Tab));

        // when
        let event = handle_key(&mut state, press(KeyCode::Enter));

        // then
        assert_eq!(Some(UserEvent::PlaceBet), event);
    }

    #[test]
    fn handle_key__enter_ignores_disabled_bet() {
        // given
        let mut state = UiState::default();
        handle_key(&mut state, press(KeyCode::Tab));
        handle_key(&mut state, press(KeyCode::Tab));

        // when
        let event = handle_key(&mut state, press(KeyCode::Enter));

        // then
        assert_eq!(None, event);
        assert_eq!(
            Some(UserEvent::Edit(InputField::BetAmount, InputEdit::Push('5'))),
            handle_key(&mut state, press(KeyCode::Char('5')))
        );
    }

    #[test]
    fn handle_key__quit_needs_confirmation() {
        // given
        let mut state = UiState::default();

        // when
        let first = handle_key(&mut state, press(KeyCode::Char('q')));
        let second = handle_key(&mut state, press(KeyCode::Char('y')));

        // then
        assert_eq!(Some(UserEvent::Redraw), first);
        assert_eq!(Some(UserEvent::Quit), second);
    }

    #[test]
    fn handle_key__digits_edit_focused_field() {
        let mut state = UiState::default();
        assert_eq!(
            Some(UserEvent::Edit(InputField::EthAmount, InputEdit::Push('7'))),
            handle_key(&mut state, press(KeyCode::Char('7')))
        );
    }
}
