//! 内容流文字提取与脱敏
//!
//! 逐条执行内容流中的图形状态与文字操作，按当前字体把字符串切分为字符编码，
//! 解码为 Unicode 并估算每个字形在用户空间中的位置。水印匹配在解码后的页面
//! 文字上进行，命中再映射回具体 Tj/TJ 操作中的编码字节，脱敏时清空这些字节
//! 并绘制不透明矩形。

use crate::fonts::{FontDecoder, FontSet};
use crate::utils::get_number;
use lopdf::content::{Content, Operation};
use lopdf::Object;
use scrub_core::{FillColor, Match, MatchSegment, Rect, WatermarkPattern};
use std::collections::HashMap;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// 相邻文字操作之间插入的分隔符
const RUN_SEPARATOR: char = ' ';

/// 矩阵乘法 m × n（PDF 行向量约定）
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn matrix_from(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = IDENTITY;
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = get_number(operand)?;
    }
    Some(m)
}

/// 估算单个字形的宽度（文字空间）
fn estimate_char_width(text: &str, font_size: f32) -> f32 {
    if text.is_ascii() {
        font_size * 0.55
    } else {
        font_size * 1.0
    }
}

/// 受 q/Q 保存与恢复的状态
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    /// 当前字体的资源名
    font: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            font: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
        }
    }
}

struct TextCursor {
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
}

impl TextCursor {
    fn new() -> Self {
        Self {
            gs: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.gs.leading;
        self.move_line(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix[4] += tx * self.text_matrix[0];
        self.text_matrix[5] += tx * self.text_matrix[1];
    }

    /// 显示一段字符串，逐个字符编码记录解码文字与包围盒
    fn show(&mut self, bytes: &[u8], decoder: &FontDecoder, run: &mut TextRun) {
        let fs = self.gs.font_size;
        let th = self.gs.horizontal_scale;
        for (start, end) in decoder.codes(bytes) {
            let code = &bytes[start..end];
            let decoded = decoder.decode(code);
            let m = multiply(&self.text_matrix, &self.gs.ctm);
            let sx = m[0].hypot(m[1]);
            let sy = m[2].hypot(m[3]);
            let width = estimate_char_width(&decoded, fs);
            let height = fs * sy;

            let glyph = run.glyphs.len();
            run.glyphs.push(Glyph {
                start: run.raw_len + start,
                end: run.raw_len + end,
                bbox: Rect {
                    x: m[4],
                    y: m[5] - 0.2 * height,
                    width: width * th * sx,
                    height,
                },
            });
            run.owners.extend(std::iter::repeat(glyph).take(decoded.len()));
            run.text.push_str(&decoded);

            // 字间距只作用于单字节编码 32
            let mut tx = width + self.gs.char_spacing;
            if code == b" " {
                tx += self.gs.word_spacing;
            }
            self.advance(tx * th);
        }
        run.raw_len += bytes.len();
    }

    /// TJ 数组中的数字：千分之一文字单位的水平位移
    fn kern(&mut self, amount: f32) {
        let tx = -amount / 1000.0 * self.gs.font_size * self.gs.horizontal_scale;
        self.advance(tx);
    }
}

/// 一个字符编码：在操作字符串中的字节区间与估算包围盒
#[derive(Debug, Clone, Copy)]
pub(crate) struct Glyph {
    pub start: usize,
    pub end: usize,
    pub bbox: Rect,
}

/// 单个文字显示操作产生的文字
#[derive(Debug, Clone)]
pub(crate) struct TextRun {
    pub op_index: usize,
    pub code_width: usize,
    pub text: String,
    pub glyphs: Vec<Glyph>,
    /// `text` 中每个字节所属的字形
    pub owners: Vec<usize>,
    /// 已消耗的原始字节数（TJ 中各字符串连续计数）
    raw_len: usize,
}

impl TextRun {
    fn new(op_index: usize, code_width: usize) -> Self {
        Self {
            op_index,
            code_width,
            text: String::new(),
            glyphs: Vec::new(),
            owners: Vec::new(),
            raw_len: 0,
        }
    }
}

/// 从内容流中提取文字（按内容流顺序）
pub(crate) fn extract_runs(content: &Content, fonts: &FontSet) -> Vec<TextRun> {
    let mut cursor = TextCursor::new();
    let mut runs = Vec::new();

    for (op_index, op) in content.operations.iter().enumerate() {
        let operands = &op.operands;
        let decoder = fonts.get(&cursor.gs.font);
        let mut run = TextRun::new(op_index, decoder.code_width());

        match op.operator.as_str() {
            "q" => cursor.stack.push(cursor.gs.clone()),
            "Q" => {
                if let Some(saved) = cursor.stack.pop() {
                    cursor.gs = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_from(operands) {
                    cursor.gs.ctm = multiply(&m, &cursor.gs.ctm);
                }
            }
            "BT" => {
                cursor.text_matrix = IDENTITY;
                cursor.line_matrix = IDENTITY;
            }
            "Tm" => {
                if let Some(m) = matrix_from(operands) {
                    cursor.text_matrix = m;
                    cursor.line_matrix = m;
                }
            }
            "Td" | "TD" if operands.len() >= 2 => {
                if let (Some(tx), Some(ty)) = (get_number(&operands[0]), get_number(&operands[1])) {
                    if op.operator == "TD" {
                        cursor.gs.leading = -ty;
                    }
                    cursor.move_line(tx, ty);
                }
            }
            "T*" => cursor.next_line(),
            "Tf" if operands.len() >= 2 => {
                if let Ok(name) = operands[0].as_name() {
                    cursor.gs.font = name.to_vec();
                }
                if let Some(size) = get_number(&operands[1]) {
                    cursor.gs.font_size = size.abs();
                }
            }
            "Tc" => {
                if let Some(v) = operands.first().and_then(get_number) {
                    cursor.gs.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = operands.first().and_then(get_number) {
                    cursor.gs.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = operands.first().and_then(get_number) {
                    cursor.gs.horizontal_scale = v / 100.0;
                }
            }
            "TL" => {
                if let Some(v) = operands.first().and_then(get_number) {
                    cursor.gs.leading = v;
                }
            }
            "Tj" => {
                if let Some(Object::String(s, _)) = operands.first() {
                    cursor.show(s, decoder, &mut run);
                }
            }
            "'" => {
                cursor.next_line();
                if let Some(Object::String(s, _)) = operands.first() {
                    cursor.show(s, decoder, &mut run);
                }
            }
            "\"" if operands.len() >= 3 => {
                if let (Some(aw), Some(ac)) = (get_number(&operands[0]), get_number(&operands[1])) {
                    cursor.gs.word_spacing = aw;
                    cursor.gs.char_spacing = ac;
                }
                cursor.next_line();
                if let Object::String(s, _) = &operands[2] {
                    cursor.show(s, decoder, &mut run);
                }
            }
            "TJ" => {
                if let Some(Object::Array(arr)) = operands.first() {
                    for item in arr {
                        match item {
                            Object::String(s, _) => {
                                cursor.show(s, decoder, &mut run);
                            }
                            other => {
                                if let Some(n) = get_number(other) {
                                    cursor.kern(n);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }

        if run.raw_len > 0 {
            runs.push(run);
        }
    }

    runs
}

/// 一页的文字：各文字操作按顺序以空格拼接
pub(crate) struct PageText {
    text: String,
    runs: Vec<TextRun>,
    /// `text` 中每个字节对应的 (run, glyph)；分隔符为 None
    owners: Vec<Option<(usize, usize)>>,
}

impl PageText {
    pub fn from_content(content: &Content, fonts: &FontSet) -> Self {
        let runs = extract_runs(content, fonts);
        let mut text = String::new();
        let mut owners = Vec::new();
        for (i, run) in runs.iter().enumerate() {
            if i > 0 {
                text.push(RUN_SEPARATOR);
                owners.push(None);
            }
            text.push_str(&run.text);
            owners.extend(run.owners.iter().map(|&glyph| Some((i, glyph))));
        }
        Self { text, runs, owners }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 查找水印并映射回内容流操作
    pub fn find(&self, page: usize, pattern: &WatermarkPattern) -> Vec<Match> {
        let mut matches = Vec::new();

        for hit in pattern.find_str(&self.text) {
            // 每个 run 中命中的首尾字形
            let mut spans: Vec<(usize, usize, usize)> = Vec::new();
            for &(run, glyph) in self.owners[hit.start..hit.end].iter().flatten() {
                match spans.last_mut() {
                    Some(span) if span.0 == run => span.2 = span.2.max(glyph),
                    _ => spans.push((run, glyph, glyph)),
                }
            }

            let mut segments = Vec::with_capacity(spans.len());
            let mut bbox: Option<Rect> = None;
            for (run, first, last) in spans {
                let run = &self.runs[run];
                let glyphs = &run.glyphs[first..=last];
                segments.push(MatchSegment {
                    op_index: run.op_index,
                    start: glyphs[0].start,
                    end: glyphs[glyphs.len() - 1].end,
                    code_width: run.code_width,
                });
                for glyph in glyphs {
                    bbox = Some(match bbox {
                        Some(b) => b.union(&glyph.bbox),
                        None => glyph.bbox,
                    });
                }
            }

            if let Some(bbox) = bbox {
                matches.push(Match {
                    page,
                    text: String::from_utf8_lossy(&self.text.as_bytes()[hit.start..hit.end])
                        .into_owned(),
                    bbox,
                    segments,
                });
            }
        }

        matches
    }
}

/// 待清空的字节区间及填充值
type BlankRange = (usize, usize, u8);

/// 单字节编码填空格，双字节编码填 CID 0
fn blank_fill(code_width: usize) -> u8 {
    if code_width > 1 {
        0x00
    } else {
        b' '
    }
}

/// 把区间内的字节替换为填充值
fn blank_bytes(bytes: &mut [u8], offset: usize, ranges: &[BlankRange]) {
    for (i, byte) in bytes.iter_mut().enumerate() {
        let pos = offset + i;
        if let Some(&(_, _, fill)) = ranges.iter().find(|&&(start, end, _)| pos >= start && pos < end) {
            *byte = fill;
        }
    }
}

fn blank_operation(op: &mut Operation, ranges: &[BlankRange]) {
    let string_slot = match op.operator.as_str() {
        "Tj" | "'" => Some(0),
        "\"" => Some(2),
        _ => None,
    };

    if let Some(slot) = string_slot {
        if let Some(Object::String(s, _)) = op.operands.get_mut(slot) {
            blank_bytes(s, 0, ranges);
        }
        return;
    }

    if op.operator == "TJ" {
        if let Some(Object::Array(arr)) = op.operands.first_mut() {
            let mut offset = 0;
            for item in arr.iter_mut() {
                if let Object::String(s, _) = item {
                    blank_bytes(s, offset, ranges);
                    offset += s.len();
                }
            }
        }
    }
}

/// 生成覆盖矩形
fn overlay_operations(matches: &[Match], fill: FillColor) -> Vec<Operation> {
    let rects: Vec<&Rect> = matches
        .iter()
        .map(|m| &m.bbox)
        .filter(|r| !r.is_empty())
        .collect();
    if rects.is_empty() {
        return Vec::new();
    }

    let [r, g, b] = fill.clamped().0;
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
    ];
    for rect in rects {
        log::debug!(
            "[Redact] 覆盖区域: x={:.2}, y={:.2}, w={:.2}, h={:.2}",
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
        ops.push(Operation::new(
            "re",
            vec![
                Object::Real(rect.x),
                Object::Real(rect.y),
                Object::Real(rect.width),
                Object::Real(rect.height),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// 对内容流执行脱敏
///
/// 原有操作整体包裹在 q/Q 中，保证覆盖矩形在页面默认坐标系中绘制。
pub(crate) fn redact_content(content: Content, matches: &[Match], fill: FillColor) -> Content {
    let mut blanks: HashMap<usize, Vec<BlankRange>> = HashMap::new();
    for m in matches {
        for seg in &m.segments {
            blanks
                .entry(seg.op_index)
                .or_default()
                .push((seg.start, seg.end, blank_fill(seg.code_width)));
        }
    }

    let mut operations = Vec::with_capacity(content.operations.len() + 4 + matches.len() * 2);
    operations.push(Operation::new("q", vec![]));
    for (index, mut op) in content.operations.into_iter().enumerate() {
        if let Some(ranges) = blanks.get(&index) {
            blank_operation(&mut op, ranges);
        }
        operations.push(op);
    }
    operations.push(Operation::new("Q", vec![]));
    operations.extend(overlay_operations(matches, fill));

    Content { operations }
}
