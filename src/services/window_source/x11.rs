use crate::debug_if_enabled;
use crate::error::Result;
use crate::haze_error;
use crate::events::{RawWindowEvent, WindowId};
use crate::geometry::Rectangle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::r#trait::{EventSource, WindowSource};

#[derive(Debug, Clone, PartialEq, Eq)]
struct X11Window {
    title: String,
    process_name: String,
    rectangle: Rectangle,
    hidden: bool,
}

/// Снимок рабочего стола X11 на момент одного опроса
#[derive(Debug, Clone, Default)]
pub struct DesktopSnapshot {
    windows: HashMap<WindowId, X11Window>,
    /// Порядок наложения, верхнее окно первым
    stacking: Vec<WindowId>,
    active: Option<WindowId>,
}

impl DesktopSnapshot {
    fn is_visible(&self, id: WindowId) -> bool {
        self.windows.get(&id).is_some_and(|w| !w.hidden)
    }

    /// Видимые окна: активное первым, затем по порядку наложения
    fn open_windows(&self) -> Vec<WindowId> {
        let mut result: Vec<WindowId> = Vec::with_capacity(self.windows.len());
        let ordered = self.active.iter().chain(self.stacking.iter());
        for &id in ordered {
            if self.is_visible(id) && !result.contains(&id) {
                result.push(id);
            }
        }
        let mut rest: Vec<WindowId> = self
            .windows
            .keys()
            .copied()
            .filter(|id| self.is_visible(*id) && !result.contains(id))
            .collect();
        rest.sort();
        result.extend(rest);
        result
    }
}

/// Сравнить два снимка и получить сырые события в порядке:
/// завершение перемещения, открытие, переименование, сворачивание, закрытие,
/// фокус, начало перемещения
fn diff_snapshots(
    prev: &DesktopSnapshot,
    next: &DesktopSnapshot,
    moving: &mut Option<WindowId>,
) -> Vec<RawWindowEvent> {
    let mut events = Vec::new();

    let active_moved = next.active.and_then(|id| {
        let before = prev.windows.get(&id)?;
        let after = next.windows.get(&id)?;
        (!before.hidden && !after.hidden && before.rectangle != after.rectangle).then_some(id)
    });

    if let Some(id) = *moving {
        if active_moved != Some(id) {
            events.push(RawWindowEvent::MoveEnded);
            *moving = None;
        }
    }

    let mut opened: Vec<WindowId> = next
        .windows
        .keys()
        .copied()
        .filter(|id| !prev.windows.contains_key(id) && next.is_visible(*id))
        .collect();
    opened.sort();
    events.extend(opened.into_iter().map(RawWindowEvent::Opened));

    let mut renamed = Vec::new();
    let mut minimized = Vec::new();
    let mut restored = Vec::new();
    for (&id, after) in &next.windows {
        let Some(before) = prev.windows.get(&id) else {
            continue;
        };
        if before.title != after.title {
            renamed.push(id);
        }
        match (before.hidden, after.hidden) {
            (false, true) => minimized.push(id),
            (true, false) => restored.push(id),
            _ => {}
        }
    }
    renamed.sort();
    minimized.sort();
    restored.sort();
    events.extend(renamed.into_iter().map(RawWindowEvent::Renamed));
    events.extend(minimized.into_iter().map(RawWindowEvent::Minimized));

    let mut closed: Vec<WindowId> = prev
        .windows
        .keys()
        .copied()
        .filter(|id| !next.windows.contains_key(id))
        .collect();
    closed.sort();
    events.extend(closed.into_iter().map(RawWindowEvent::Closed));

    // Восстановленное окно считается получившим фокус; активное - последним
    let active_changed = next.active.filter(|id| prev.active != Some(*id) && next.is_visible(*id));
    for id in restored {
        if Some(id) != active_changed && Some(id) != next.active {
            events.push(RawWindowEvent::Focused(id));
        }
    }
    if let Some(id) = active_changed {
        events.push(RawWindowEvent::Focused(id));
    } else if let Some(id) = next.active {
        if prev.is_visible(id) != next.is_visible(id) && next.is_visible(id) {
            events.push(RawWindowEvent::Focused(id));
        }
    }

    if moving.is_none() {
        if let Some(id) = active_moved {
            events.push(RawWindowEvent::MoveStarted);
            *moving = Some(id);
        }
    }

    events
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WmctrlEntry {
    id: WindowId,
    desktop: i64,
    pid: u32,
    rectangle: Rectangle,
    title: String,
}

/// Строка `wmctrl -lpG`: `id desktop pid x y w h host title...`
fn parse_wmctrl_line(line: &str) -> Option<WmctrlEntry> {
    let mut parts = line.split_whitespace();
    let id = parse_hex_id(parts.next()?)?;
    let desktop = parts.next()?.parse().ok()?;
    let pid = parts.next()?.parse().ok()?;
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    let _host = parts.next()?;
    let title = parts.collect::<Vec<_>>().join(" ");

    Some(WmctrlEntry {
        id,
        desktop,
        pid,
        rectangle: Rectangle::from_geometry(x, y, width, height),
        title,
    })
}

fn parse_hex_id(raw: &str) -> Option<WindowId> {
    let raw = raw.trim();
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).ok().map(WindowId::new)
}

/// `_NET_CLIENT_LIST_STACKING(WINDOW): window id # 0x1e00003, 0x3a00003`
fn parse_window_id_list(output: &str) -> Vec<WindowId> {
    match output.split_once('#') {
        Some((_, ids)) => ids
            .split(',')
            .filter_map(parse_hex_id)
            .filter(|id| id.value() != 0)
            .collect(),
        None => Vec::new(),
    }
}

/// `_NET_CURRENT_DESKTOP(CARDINAL) = 0`
fn parse_cardinal(output: &str) -> Option<i64> {
    output.split_once('=')?.1.split(',').next()?.trim().parse().ok()
}

fn parse_hidden_state(output: &str) -> bool {
    output.contains("_NET_WM_STATE_HIDDEN")
}

/// Строки `xrandr --listmonitors`: ` 0: +*DP-1 1920/527x1080/296+0+0  DP-1`
fn parse_xrandr_monitors(output: &str) -> Vec<Rectangle> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().find_map(parse_xrandr_geometry))
        .collect()
}

fn parse_xrandr_geometry(token: &str) -> Option<Rectangle> {
    let mut parts = token.split('+');
    let size = parts.next()?;
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let (width, height) = size.split_once('x')?;
    let width = width.split('/').next()?.parse().ok()?;
    let height = height.split('/').next()?.parse().ok()?;
    Some(Rectangle::from_geometry(x, y, width, height))
}

fn run_command(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .inspect_err(|e| debug!("Не удалось запустить {}: {}", program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(haze_error!(source_unavailable, "{} вернул ошибку: {}", program, stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn process_name_for_pid(pid: u32) -> String {
    if pid == 0 {
        return String::new();
    }
    std::fs::read_to_string(format!("/proc/{}/comm", pid))
        .map(|name| name.trim().to_string())
        .unwrap_or_default()
}

fn is_window_hidden(id: WindowId) -> bool {
    let hex = format!("0x{:x}", id.value());
    run_command("xprop", &["-id", &hex, "_NET_WM_STATE"])
        .map(|output| parse_hidden_state(&output))
        .unwrap_or(false)
}

fn capture_snapshot() -> Result<DesktopSnapshot> {
    let listing = run_command("wmctrl", &["-lpG"])?;
    let current_desktop = run_command("xprop", &["-root", "_NET_CURRENT_DESKTOP"])
        .ok()
        .and_then(|output| parse_cardinal(&output));
    let active = run_command("xprop", &["-root", "_NET_ACTIVE_WINDOW"])
        .ok()
        .and_then(|output| parse_window_id_list(&output).into_iter().next());
    let mut stacking = run_command("xprop", &["-root", "_NET_CLIENT_LIST_STACKING"])
        .map(|output| parse_window_id_list(&output))
        .unwrap_or_default();
    stacking.reverse();

    let mut windows = HashMap::new();
    for entry in listing.lines().filter_map(parse_wmctrl_line) {
        let on_other_desktop = entry.desktop >= 0 && current_desktop.is_some_and(|d| d != entry.desktop);
        let hidden = on_other_desktop || is_window_hidden(entry.id);
        windows.insert(
            entry.id,
            X11Window {
                title: entry.title,
                process_name: process_name_for_pid(entry.pid),
                rectangle: entry.rectangle,
                hidden,
            },
        );
    }

    Ok(DesktopSnapshot {
        windows,
        stacking,
        active,
    })
}

fn query_monitors() -> Vec<Rectangle> {
    let monitors = run_command("xrandr", &["--listmonitors"])
        .map(|output| parse_xrandr_monitors(&output))
        .unwrap_or_default();
    if !monitors.is_empty() {
        return monitors;
    }

    warn!("xrandr не вернул мониторы, используем геометрию рабочего стола");
    run_command("xprop", &["-root", "_NET_DESKTOP_GEOMETRY"])
        .ok()
        .and_then(|output| {
            let (_, values) = output.split_once('=')?;
            let mut values = values.split(',').map(|v| v.trim().parse::<u32>());
            let width = values.next()?.ok()?;
            let height = values.next()?.ok()?;
            Some(vec![Rectangle::from_geometry(0, 0, width, height)])
        })
        .unwrap_or_default()
}

/// Источник окон X11 поверх `wmctrl`, `xprop` и `xrandr`.
///
/// Метаданные читаются из последнего снимка, поэтому запросы движка не
/// запускают внешние процессы.
pub struct X11Source {
    snapshot: RwLock<DesktopSnapshot>,
    monitors: Vec<Rectangle>,
}

impl X11Source {
    pub fn connect() -> Result<Self> {
        info!("Инициализация X11Source");

        let snapshot = capture_snapshot()?;
        let monitors = query_monitors();
        info!(
            "X11: обнаружено {} окон и {} мониторов",
            snapshot.windows.len(),
            monitors.len()
        );

        Ok(Self {
            snapshot: RwLock::new(snapshot),
            monitors,
        })
    }

    fn find<T>(&self, id: WindowId, f: impl FnOnce(&X11Window) -> T) -> Option<T> {
        self.snapshot.read().windows.get(&id).map(f)
    }
}

impl WindowSource for X11Source {
    fn open_windows(&self) -> Vec<WindowId> {
        self.snapshot.read().open_windows()
    }

    fn title(&self, id: WindowId) -> Option<String> {
        self.find(id, |w| w.title.clone())
    }

    fn process_name(&self, id: WindowId) -> Option<String> {
        self.find(id, |w| w.process_name.clone())
    }

    /// Скрытое окно (свёрнутое или на другом рабочем столе) не занимает места на экране
    fn rectangle(&self, id: WindowId) -> Option<Rectangle> {
        self.find(id, |w| (!w.hidden).then_some(w.rectangle)).flatten()
    }

    fn monitors(&self) -> Vec<Rectangle> {
        self.monitors.clone()
    }
}

pub struct X11EventSource {
    source: Arc<X11Source>,
    polling_interval: Duration,
    moving: Option<WindowId>,
}

impl X11EventSource {
    pub fn new(source: Arc<X11Source>, polling_interval_ms: u64) -> Self {
        Self {
            source,
            polling_interval: Duration::from_millis(polling_interval_ms.max(50)),
            moving: None,
        }
    }
}

#[async_trait::async_trait]
impl EventSource for X11EventSource {
    async fn run(mut self: Box<Self>, events: mpsc::Sender<RawWindowEvent>) -> Result<()> {
        info!("X11 polling активен с интервалом {:?}", self.polling_interval);

        let mut interval = interval(self.polling_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let next = match tokio::task::spawn_blocking(capture_snapshot).await {
                Ok(Ok(snapshot)) => snapshot,
                Ok(Err(e)) => {
                    warn!("Не удалось получить снимок окон: {}. Повтор через 10 секунд", e);
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    continue;
                }
                Err(e) => {
                    error!("Задача опроса окон завершилась аварийно: {}", e);
                    continue;
                }
            };

            let raw_events = {
                let mut current = self.source.snapshot.write();
                let raw_events = diff_snapshots(&current, &next, &mut self.moving);
                *current = next;
                raw_events
            };

            for event in raw_events {
                debug_if_enabled!("X11 событие: {}", event);
                if events.send(event).await.is_err() {
                    debug!("Получатель событий закрыт, X11 источник завершает работу");
                    return Ok(());
                }
            }
        }
    }
}
