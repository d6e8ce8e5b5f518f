//! The browser half of the runtime. Exported documents inline this engine
//! next to the bundle; it mirrors `crate::game` so a game plays the same in
//! `gridplay play` and in the page.

pub(super) const ENGINE_JS: &str = r##"const Gridplay = (() => {
  'use strict';

  // ── Constants ─────────────────────────────────────────────────────
  const DIRECTIONS = new Map([['up', [0, -1]], ['down', [0, 1]], ['left', [-1, 0]], ['right', [1, 0]]]);
  const LAYERS = ['back', 'main', 'front'];
  const BOUND = ['move', 'movePixels', 'moveTiles', 'setPixelPos', 'setTilePos', 'getPixelPos',
    'getTilePos', 'getTile', 'setTile', 'getLayer', 'setLayer'];
  const GLOBAL = ['getTileAt', 'setTileAt', 'say', 'getObject', 'createObject', 'deleteObject',
    'addSound', 'playSound', 'addText', 'removeText', 'getTime', 'getDeltaTime', 'isKey', 'isKeyDown'];
  const DIALOGUE_FONT = 16, DIALOGUE_LINE = 20, DIALOGUE_LINES = 4, DIALOGUE_PADDING = 8;
  const ERROR_FONT = 14;
  const MAX_ARRAY_LENGTH = 65536;

  const option = (options, key) =>
    options !== null && typeof options === 'object' ? options[key] : undefined;
  const missing = (value) => value === undefined || value === null;

  function nonEmpty(value, what) {
    if (typeof value !== 'string' || value.length === 0) throw new TypeError(`Invalid ${what} ${value}`);
    return value;
  }

  function layerOf(value) {
    if (!LAYERS.includes(value)) throw new TypeError(`Invalid layer ${value}`);
    return value;
  }

  function range(n) {
    n = Number(n);
    if (!Number.isInteger(n) || n < 0 || n > MAX_ARRAY_LENGTH) throw new RangeError(`Invalid range length ${n}`);
    return Array.from({ length: n }, (_, i) => i);
  }

  function describe(phase, id, error) {
    const head = error instanceof Error ? `${error.name}: ${error.message}` : `Uncaught ${error}`;
    return `${head}\n    in ${phase} of '${id}'`;
  }

  // ── Boot ──────────────────────────────────────────────────────────
  function boot(bundle, canvas) {
    const ctx = canvas.getContext('2d');
    const { mapSize, spriteSize, pixelPixels } = bundle;
    const spritePixels = spriteSize * pixelPixels;
    const mapPixels = mapSize * spritePixels;
    const background = bundle.background.slice();
    const objects = bundle.gameObjects.map((o) => ({ ...o }));
    const live = [];
    const programs = new Map();
    const texts = new Map();
    const sounds = new Map();
    const pressed = new Set();
    let lastPressed = new Set();
    let serial = bundle.nextSerial;
    let textSerial = 1;
    let dialogue = null;
    let time = 0;
    let deltaTime = 0;
    let halted = false;

    const constants = { mapSize, mapPixels, spriteSize, spritePixels, pixelPixels };

    // ── Entities ────────────────────────────────────────────────────
    const slotOf = (cell) => {
      if (cell.slot === null) throw new ReferenceError('object has been deleted');
      return cell.slot;
    };
    const slotOfId = (id) => objects.findIndex((o) => o.id === id);
    const fits = (x, y) => {
      const max = mapPixels - spritePixels;
      return x >= 0 && x <= max && y >= 0 && y <= max;
    };
    const cellAt = (tx, ty) =>
      tx >= 0 && tx < mapSize && ty >= 0 && ty < mapSize ? Math.floor(ty) * mapSize + Math.floor(tx) : -1;
    const tileName = (index) => (index === undefined ? null : bundle.tileNames[index] ?? null);

    function tileNamed(name) {
      const index = bundle.tileNames.indexOf(`${name}`);
      if (index < 0) throw new ReferenceError(`${name} is not a valid tile`);
      return index;
    }

    function moveTo(cell, x, y) {
      const object = objects[slotOf(cell)];
      if (fits(x, y)) {
        object.x = x;
        object.y = y;
      }
    }

    function tilePos(cell) {
      const object = objects[slotOf(cell)];
      return [Math.floor(object.x / spritePixels), Math.floor(object.y / spritePixels)];
    }

    function bind(cell) {
      return {
        move(dir) {
          const step = typeof dir === 'string' ? DIRECTIONS.get(dir) : undefined;
          if (!step) throw new TypeError(`Invalid direction ${dir}`);
          const object = objects[slotOf(cell)];
          moveTo(cell, object.x + step[0] * spritePixels, object.y + step[1] * spritePixels);
        },
        movePixels(x, y) {
          const object = objects[slotOf(cell)];
          moveTo(cell, object.x + Number(x) * pixelPixels, object.y + Number(y) * pixelPixels);
        },
        moveTiles(x, y) {
          const object = objects[slotOf(cell)];
          moveTo(cell, object.x + Number(x) * spritePixels, object.y + Number(y) * spritePixels);
        },
        setPixelPos(x, y) { moveTo(cell, Number(x) * pixelPixels, Number(y) * pixelPixels); },
        setTilePos(x, y) { moveTo(cell, Number(x) * spritePixels, Number(y) * spritePixels); },
        getPixelPos() {
          const object = objects[slotOf(cell)];
          return { x: Math.floor(object.x / pixelPixels), y: Math.floor(object.y / pixelPixels) };
        },
        getTilePos() {
          const [x, y] = tilePos(cell);
          return { x, y };
        },
        getTile() {
          const [x, y] = tilePos(cell);
          const index = cellAt(x, y);
          return index < 0 ? null : tileName(background[index]);
        },
        setTile(name) {
          const [x, y] = tilePos(cell);
          const tile = tileNamed(name);
          const index = cellAt(x, y);
          if (index >= 0) background[index] = tile;
        },
        getLayer() { return objects[slotOf(cell)].layer; },
        setLayer(layer) {
          const slot = slotOf(cell);
          objects[slot].layer = layerOf(layer);
        },
      };
    }

    function entry(id, slot) {
      const cell = { slot };
      const methods = bind(cell);
      const handle = Object.freeze({ id, ...methods });
      return { id, cell, methods, handle, hooks: null };
    }

    function compile(sprite) {
      if (!programs.has(sprite)) {
        let program;
        try {
          const source = `'use strict';\nreturn (function () {\n${bundle.codes[sprite] ?? ''}\n;return {\n` +
            `awake: typeof awake === 'function' ? awake : undefined,\n` +
            `start: typeof start === 'function' ? start : undefined,\n` +
            `update: typeof update === 'function' ? update : undefined };\n})();`;
          program = new Function(...Object.keys(constants), ...GLOBAL, ...BOUND, 'range', source);
        } catch (error) {
          program = error;
        }
        programs.set(sprite, program);
      }
      const program = programs.get(sprite);
      if (program instanceof Error) throw program;
      return program;
    }

    function load(item) {
      const program = compile(objects[slotOf(item.cell)].sprite);
      item.hooks = program(
        ...Object.values(constants),
        ...GLOBAL.map((name) => api[name]),
        ...BOUND.map((name) => item.methods[name]),
        range,
      );
    }

    // ── Global capabilities ─────────────────────────────────────────
    const api = {
      getTileAt(x, y) {
        const index = cellAt(Number(x), Number(y));
        return index < 0 ? null : tileName(background[index]);
      },
      setTileAt(x, y, name) {
        const tile = tileNamed(name);
        const index = cellAt(Number(x), Number(y));
        if (index < 0) throw new RangeError(`tile (${x}, ${y}) is outside the map`);
        background[index] = tile;
      },
      say(text) { dialogue = `${text}`; },
      getObject(id) {
        nonEmpty(id, 'id');
        const slot = slotOfId(id);
        return slot < 0 ? null : live[slot].handle;
      },
      createObject(name, x, y, options) {
        name = `${name}`;
        const sprite = bundle.objectNames.indexOf(name);
        if (sprite < 0) throw new ReferenceError(`No sprite found with name ${name}`);
        let id = option(options, 'id');
        if (missing(id)) {
          do {
            id = `${name}-${serial++}`;
          } while (slotOfId(id) >= 0);
        } else {
          nonEmpty(id, 'id');
          if (slotOfId(id) >= 0) throw new TypeError(`object id ${id} is already in use`);
        }
        const layer = option(options, 'layer');
        objects.push({
          id,
          x: Number(x) * pixelPixels,
          y: Number(y) * pixelPixels,
          sprite,
          layer: missing(layer) ? 'main' : layerOf(layer),
        });
        const item = entry(id, objects.length - 1);
        live.push(item);
        load(item);
        if (item.hooks.start) item.hooks.start();
        return item.handle;
      },
      deleteObject(id) {
        nonEmpty(id, 'id');
        const slot = slotOfId(id);
        if (slot < 0) throw new ReferenceError(`No object found with ID ${id}`);
        objects.splice(slot, 1);
        const [removed] = live.splice(slot, 1);
        removed.cell.slot = null;
        for (let i = slot; i < live.length; i++) live[i].cell.slot = i;
      },
      addSound(name, url) { sounds.set(`${name}`, new Audio(`${url}`)); },
      playSound(name) {
        const sound = sounds.get(`${name}`);
        if (!sound) throw new ReferenceError(`No sound found with name ${name}`);
        sound.currentTime = 0;
        sound.play().catch((error) => console.warn('[gridplay]', error));
      },
      addText(text, x, y, options) {
        let id = option(options, 'id');
        if (missing(id)) {
          do {
            id = `text-${textSerial++}`;
          } while (texts.has(id));
        } else {
          id = `${id}`;
        }
        const color = option(options, 'color');
        const size = option(options, 'size');
        const item = {
          id,
          text: `${text}`,
          x: Number(x),
          y: Number(y),
          color: missing(color) ? 'black' : `${color}`,
          size: missing(size) ? 16 : Number(size),
        };
        texts.set(id, item);
        return { ...item };
      },
      removeText(id) {
        if (!texts.delete(`${id}`)) throw new ReferenceError(`No text found with ID ${id}`);
      },
      getTime: () => time,
      getDeltaTime: () => deltaTime,
      isKey(key) {
        key = nonEmpty(key, 'key').toLowerCase();
        return pressed.has(key) && !lastPressed.has(key);
      },
      isKeyDown(key) { return pressed.has(nonEmpty(key, 'key').toLowerCase()); },
    };

    // ── Drawing ─────────────────────────────────────────────────────
    function drawSprite(cells, x, y) {
      cells.forEach((index, i) => {
        const color = bundle.colors[index];
        if (index < 0 || color === undefined) return;
        ctx.fillStyle = color;
        ctx.fillRect(x + (i % spriteSize) * pixelPixels, y + Math.floor(i / spriteSize) * pixelPixels,
          pixelPixels, pixelPixels);
      });
    }

    function fillText(text, x, y, size, color) {
      ctx.font = `${size}px monospace`;
      ctx.fillStyle = 'black';
      ctx.fillStyle = color;
      ctx.fillText(text, x, y);
    }

    function draw() {
      ctx.fillStyle = 'white';
      ctx.fillRect(0, 0, mapPixels, mapPixels);
      background.forEach((tile, i) => {
        const cells = bundle.tiles[tile];
        if (cells) drawSprite(cells, (i % mapSize) * spritePixels, Math.floor(i / mapSize) * spritePixels);
      });
      for (const layer of LAYERS) {
        for (const object of objects) {
          const cells = bundle.objects[object.sprite];
          if (object.layer === layer && cells) drawSprite(cells, object.x, object.y);
        }
      }
      for (const text of texts.values()) {
        fillText(text.text, text.x * pixelPixels, text.y * pixelPixels + text.size, text.size, text.color);
      }
      if (dialogue) {
        const left = mapPixels / 8;
        const top = (mapPixels * 3) / 8;
        ctx.fillStyle = 'white';
        ctx.fillRect(left - DIALOGUE_PADDING, top - DIALOGUE_PADDING,
          (mapPixels * 3) / 4 + DIALOGUE_PADDING * 2, mapPixels / 4 + DIALOGUE_PADDING * 2);
        const chars = Array.from(dialogue);
        for (let line = 0; line < DIALOGUE_LINES && line * DIALOGUE_LINE < chars.length; line++) {
          const text = chars.slice(line * DIALOGUE_LINE, (line + 1) * DIALOGUE_LINE).join('');
          fillText(text, left, top + DIALOGUE_FONT * (line + 1), DIALOGUE_FONT, 'black');
        }
      }
    }

    // ── Faults ──────────────────────────────────────────────────────
    function fault(phase, item, error) {
      halted = true;
      console.error(error);
      const message = describe(phase, item.id, error);
      ctx.fillStyle = 'white';
      ctx.fillRect(0, 0, mapPixels, mapPixels);
      message.split('\n').forEach((line, i) => {
        fillText(line, 10, 10 + (ERROR_FONT + 2) * (i + 1), ERROR_FONT, 'red');
      });
      const report = document.createElement('pre');
      report.className = 'error';
      report.textContent = error instanceof Error && error.stack ? error.stack : message;
      document.body.appendChild(report);
    }

    function guard(phase, item, run) {
      try {
        run();
        return true;
      } catch (error) {
        fault(phase, item, error);
        return false;
      }
    }

    // ── Loop ────────────────────────────────────────────────────────
    function frame(timestamp) {
      if (halted) return;
      deltaTime = Math.max(0, timestamp - time);
      time = timestamp;
      const updates = live.filter((item) => item.hooks && item.hooks.update);
      for (const item of updates) {
        if (item.cell.slot === null) continue;
        if (!guard('update', item, item.hooks.update)) return;
      }
      draw();
      lastPressed = new Set(pressed);
      requestAnimationFrame(frame);
    }

    window.addEventListener('keydown', (event) => {
      pressed.add(event.key.toLowerCase());
      dialogue = null;
    });
    window.addEventListener('keyup', (event) => pressed.delete(event.key.toLowerCase()));
    canvas.addEventListener('mousedown', () => { dialogue = null; });

    objects.forEach((object, slot) => live.push(entry(object.id, slot)));
    const initial = live.slice();
    for (const item of initial) {
      if (item.cell.slot !== null && !guard('load', item, () => load(item))) return;
    }
    for (const phase of ['awake', 'start']) {
      for (const item of initial) {
        const hook = item.cell.slot !== null && item.hooks ? item.hooks[phase] : undefined;
        if (hook && !guard(phase, item, hook)) return;
      }
    }
    draw();
    requestAnimationFrame(frame);
  }

  return { boot };
})();
"##;
