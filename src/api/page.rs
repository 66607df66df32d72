//! Game page - `GET /`
//!
//! A single self-contained HTML document. Clicks and auto-clicker income are
//! computed in the browser and pushed to `/api/save`; purchases and rewards go
//! through the server-priced endpoints.

use axum::{extract::State, response::Html, routing::get, Router};

use super::ApiState;
use crate::config::Theme;
use crate::economy::AUTO_INCOME_PERIOD_SECS;

pub fn routes() -> Router<ApiState> {
    Router::new().route("/", get(game_page))
}

async fn game_page(State(state): State<ApiState>) -> Html<String> {
    Html(render_page(state.config.theme))
}

/// Substitute the theme into the page template
pub fn render_page(theme: &Theme) -> String {
    PAGE_TEMPLATE
        .replace("{{TITLE}}", theme.title)
        .replace("{{CURRENCY}}", theme.currency)
        .replace("{{MASCOT}}", theme.mascot)
        .replace("{{BACKGROUND}}", theme.background)
        .replace("{{ACCENT}}", theme.accent)
        .replace("{{THEME}}", theme.name)
        .replace(
            "{{AUTO_PERIOD_MS}}",
            &(AUTO_INCOME_PERIOD_SECS * 1000).to_string(),
        )
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{TITLE}} {{MASCOT}}</title>
<script src="https://telegram.org/js/telegram-web-app.js"></script>
<style>
  body { background: {{BACKGROUND}}; color: #fff; text-align: center; padding: 20px;
         font-family: Arial, sans-serif; margin: 0; min-height: 100vh; }
  .mascot { width: 120px; height: 120px; font-size: 72px; line-height: 120px;
            border-radius: 50%; margin: 24px auto; cursor: pointer; user-select: none;
            background: {{ACCENT}}; transition: transform 0.1s; }
  .mascot:active { transform: scale(0.9); }
  .coins { font-size: 40px; color: {{ACCENT}}; font-weight: bold; margin: 12px; }
  .stats { opacity: 0.8; margin-bottom: 12px; }
  button { background: #4caf50; color: #fff; border: none; padding: 12px 16px; margin: 6px;
           border-radius: 10px; font-size: 16px; cursor: pointer; }
  button.secondary { background: #3f51b5; }
  #toast { position: fixed; left: 50%; bottom: 24px; transform: translateX(-50%);
           background: rgba(0,0,0,0.8); padding: 10px 16px; border-radius: 8px; display: none; }
  table { margin: 16px auto; border-collapse: collapse; }
  td { padding: 4px 12px; }
  .pop { position: fixed; color: {{ACCENT}}; font-weight: bold; pointer-events: none;
         animation: rise 1s forwards; }
  @keyframes rise { to { transform: translateY(-60px); opacity: 0; } }
</style>
</head>
<body data-theme="{{THEME}}">
<h1>{{MASCOT}} {{TITLE}}</h1>
<div class="coins" id="coins">100</div>
<div>{{CURRENCY}}</div>
<div class="stats">
  Power <span id="power">1</span> &middot; Autos <span id="autos">0</span>
  &middot; x<span id="multiplier">1</span> &middot; Prestige <span id="prestige">0</span>
</div>

<div class="mascot" id="mascot">{{MASCOT}}</div>

<div id="shop"></div>
<div>
  <button class="secondary" id="daily">Daily reward</button>
  <button class="secondary" id="artifact">Discover artifact</button>
  <button class="secondary" id="ascend">Ascend</button>
</div>

<h3>Leaderboard</h3>
<table id="leaderboard"></table>
<div id="toast"></div>

<script>
const game = {
  id: null, username: 'Player',
  coins: 100, power: 1, autos: 0, multiplier: 1, totalClicks: 0, prestige: 0,
  dirty: false, saving: null, pending: 0, earned: 0,
};

function playerId() {
  const tg = window.Telegram && window.Telegram.WebApp;
  if (tg) {
    tg.expand();
    tg.ready();
    const user = tg.initDataUnsafe && tg.initDataUnsafe.user;
    if (user && user.id) {
      game.username = user.username || user.first_name || game.username;
      return String(user.id);
    }
  }
  let id = localStorage.getItem('clicker_player_id');
  if (!id) {
    id = 'user_' + Math.random().toString(36).slice(2, 11);
    localStorage.setItem('clicker_player_id', id);
  }
  return id;
}

function toast(text) {
  const el = document.getElementById('toast');
  el.textContent = text;
  el.style.display = 'block';
  clearTimeout(el.timer);
  el.timer = setTimeout(() => { el.style.display = 'none'; }, 2000);
}

function apply(p) {
  game.coins = p.coins; game.power = p.power; game.autos = p.autos;
  game.multiplier = p.multiplier; game.totalClicks = p.total_clicks;
  game.prestige = p.prestige;
  render();
}

function render() {
  document.getElementById('coins').textContent = game.coins;
  document.getElementById('power').textContent = game.power;
  document.getElementById('autos').textContent = game.autos;
  document.getElementById('multiplier').textContent = game.multiplier;
  document.getElementById('prestige').textContent = game.prestige;
}

async function api(path, body) {
  const res = await fetch(path, body === undefined ? {} : {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  });
  const data = await res.json();
  if (!res.ok) throw new Error(data.error || res.statusText);
  return data;
}

async function save() {
  if (game.saving) await game.saving;
  if (!game.dirty || game.pending) return;
  game.dirty = false;
  game.saving = api('/api/save', {
    player_id: game.id, username: game.username, coins: game.coins,
    power: game.power, autos: game.autos, multiplier: game.multiplier,
    total_clicks: game.totalClicks,
  }).catch(() => { game.dirty = true; }).finally(() => { game.saving = null; });
  await game.saving;
}

// Server-priced request. Income earned while it is in flight is re-added on top of the reply.
async function serverAction(path, body) {
  await save();
  game.pending += 1;
  const earnedBefore = game.earned;
  const clicksBefore = game.totalClicks;
  try {
    const out = await api(path, body);
    const earned = game.earned - earnedBefore;
    const clicks = game.totalClicks - clicksBefore;
    if (out.player) apply(out.player);
    else if (out.coins !== undefined) game.coins = out.coins;
    game.coins += earned;
    game.totalClicks += clicks;
    if (earned || clicks) game.dirty = true;
    render();
    return out;
  } finally {
    game.pending -= 1;
  }
}

async function loadShop() {
  const shop = await api('/api/shop?player_id=' + encodeURIComponent(game.id));
  const box = document.getElementById('shop');
  box.innerHTML = '';
  for (const item of shop.items) {
    const btn = document.createElement('button');
    btn.textContent = item.name + ' (' + item.cost + ')';
    btn.title = item.description;
    btn.onclick = () => buy(item.id);
    box.appendChild(btn);
  }
}

async function buy(itemId) {
  try {
    const out = await serverAction('/api/purchase', { player_id: game.id, item_id: itemId });
    toast('Bought ' + itemId + ' for ' + out.cost);
    loadShop();
  } catch (e) { toast(e.message); }
}

async function action(path, describe) {
  try {
    const out = await serverAction(path, { player_id: game.id });
    toast(describe(out));
    loadShop();
  } catch (e) { toast(e.message); }
}

async function loadLeaderboard() {
  try {
    const board = await api('/api/leaderboard?limit=10');
    const table = document.getElementById('leaderboard');
    table.innerHTML = '';
    for (const e of board.entries) {
      const row = table.insertRow();
      row.insertCell().textContent = '#' + e.rank;
      row.insertCell().textContent = e.username;
      row.insertCell().textContent = e.score;
    }
  } catch (e) { /* leaderboard is best effort */ }
}

function pop(amount) {
  const el = document.createElement('div');
  el.className = 'pop';
  el.textContent = '+' + amount;
  el.style.left = (40 + Math.random() * 20) + '%';
  el.style.top = (40 + Math.random() * 20) + '%';
  document.body.appendChild(el);
  setTimeout(() => el.remove(), 1000);
}

async function init() {
  game.id = playerId();
  try { apply(await api('/api/user/' + encodeURIComponent(game.id))); } catch (e) { render(); }

  document.getElementById('mascot').onclick = () => {
    const earned = game.power * game.multiplier;
    game.coins += earned;
    game.earned += earned;
    game.totalClicks += 1;
    game.dirty = true;
    render();
    pop(earned);
  };
  document.getElementById('daily').onclick = () =>
    action('/api/daily', o => '+' + o.reward + ' {{CURRENCY}}');
  document.getElementById('artifact').onclick = () =>
    action('/api/artifact/discover', o => 'Found ' + o.artifact.name);
  document.getElementById('ascend').onclick = () =>
    action('/api/ascend', o => 'Prestige ' + o.prestige + ', x' + o.multiplier);

  setInterval(() => {
    if (game.autos > 0) {
      const earned = game.autos * game.multiplier;
      game.coins += earned;
      game.earned += earned;
      game.dirty = true;
      render();
    }
  }, {{AUTO_PERIOD_MS}});
  setInterval(() => { if (!game.pending) save(); }, 3000);
  setInterval(loadLeaderboard, 15000);
  window.addEventListener('beforeunload', save);

  loadShop();
  loadLeaderboard();
}

init();
</script>
</body>
</html>
"#;
