use wavesel_core::BranchHint;
use wavesel_ir::{CfNode, Def, DefId, IfNode, Instr, LoopNode, Shader, SourceLoc};

use crate::parse::word::Word;

mod instruction;
mod word;


/// An open `if`/`else`/`loop` whose body is still being read.
#[derive(Debug)]
enum Frame {
    Then { cond: DefId, divergent: bool, hint: BranchHint, loc: SourceLoc, body: Vec<CfNode> },
    Else { node: IfNode, body: Vec<CfNode> },
    Loop { divergent_break: bool, loc: SourceLoc, body: Vec<CfNode> },
}

impl Frame {
    fn body(&mut self) -> &mut Vec<CfNode> {
        match self {
            Self::Then { body, .. } | Self::Else { body, .. } | Self::Loop { body, .. } => body,
        }
    }
}

#[derive(Debug)]
struct ParseContext {
    shader: Shader,
    stack: Vec<Frame>,
    errors: Vec<String>,
    /// Phi sources, which are only checked at the end.
    forward_refs: Vec<(u32, DefId)>,
    line: u32,
}

impl ParseContext {
    fn error(&mut self, message: String) {
        self.errors.push(format!("line {}: {message}", self.line));
    }

    fn consume<T>(&mut self, res: Result<T, String>) -> Option<T> {
        match res {
            Ok(it) => Some(it),
            Err(e) => {
                self.error(e);
                None
            }
        }
    }

    /// Parses a reference to an already defined value.
    fn use_ref(&mut self, src: &str) -> Option<DefId> {
        let id = self.consume(instruction::parse_ref(src))?;

        if self.shader.def(id).is_none() {
            self.error(format!("use of undefined value `{id}`"));
            return None;
        }

        Some(id)
    }

    fn body(&mut self) -> &mut Vec<CfNode> {
        match self.stack.last_mut() {
            Some(frame) => frame.body(),
            None => &mut self.shader.body,
        }
    }

    fn push_instr(&mut self, instr: Instr) {
        let body = self.body();
        match body.last_mut() {
            Some(CfNode::Block(instrs)) => instrs.push(instr),
            _ => body.push(CfNode::Block(vec![instr])),
        }
    }

    fn in_loop(&self) -> bool {
        self.stack.iter().any(|frame| matches!(frame, Frame::Loop { .. }))
    }
}

#[derive(Debug)]
pub struct ParseOutput {
    /// Only present when there were no errors.
    pub shader: Option<Shader>,
    pub errors: Vec<String>,
}

impl From<ParseContext> for ParseOutput {
    fn from(context: ParseContext) -> Self {
        let shader = context.errors.is_empty().then_some(context.shader);
        Self { shader, errors: context.errors }
    }
}

#[must_use]
pub fn parse(input: &str) -> ParseOutput {
    let mut context = ParseContext {
        shader: Shader::default(),
        stack: Vec::new(),
        errors: Vec::new(),
        forward_refs: Vec::new(),
        line: 0,
    };

    for line in input.lines() {
        context.line += 1;

        let line = line.split_once(';').map_or(line, |(line, _comment)| line);
        let line = line.trim();

        parse_line(&mut context, line);
    }

    if !context.stack.is_empty() {
        context.error(format!("{} unclosed block(s) at end of input", context.stack.len()));
    }

    for (line, id) in std::mem::take(&mut context.forward_refs) {
        if context.shader.def(id).is_none() {
            context.errors.push(format!("line {line}: use of undefined value `{id}`"));
        }
    }

    context.into()
}

fn parse_line(context: &mut ParseContext, line: &str) {
    if line.is_empty() {
        return;
    }

    if let Some(directive) = line.strip_prefix('.') {
        return parse_directive(context, directive);
    }

    if line == "}" {
        return close(context);
    }

    if line == "} else {" {
        return open_else(context);
    }

    if let Some(header) = line.strip_suffix('{') {
        let header = header.trim_end();
        let (keyword, args) = header.split_once(' ').unwrap_or((header, ""));

        return match keyword {
            "if" => open_if(context, args.trim()),
            "loop" => open_loop(context, args.trim()),
            _ => context.error(format!("Unknown block `{keyword}`")),
        };
    }

    parse_instruction(context, line);
}

fn parse_directive(context: &mut ParseContext, directive: &str) {
    let (name, value) = directive.split_once(' ').unwrap_or((directive, ""));
    let value = value.trim();

    match name {
        "gfx" => context.shader.gfx = context.consume(value.parse()),
        "wave" => context.shader.wave = context.consume(value.parse()),
        "stage" => context.shader.stage = context.consume(value.parse()),
        _ => context.error(format!("Unknown directive `.{name}`")),
    }
}

fn open_if(context: &mut ParseContext, args: &str) {
    let (cond, hint) = args.split_once(' ').unwrap_or((args, ""));

    let cond = context.use_ref(cond);
    let hint = match hint.trim() {
        "" => Some(BranchHint::None),
        hint => context.consume(hint.parse::<BranchHint>()),
    };

    let divergent = match cond.and_then(|cond| context.shader.def(cond).copied()) {
        Some(def) if def.is_bool() => def.divergent,
        Some(def) => {
            let message = format!("if condition `{}` is not a boolean", def.id);
            context.error(message);
            false
        }
        None => false,
    };

    // keep going so that the matching `}` still lines up.
    let loc = SourceLoc { line: context.line };
    context.stack.push(Frame::Then {
        cond: cond.unwrap_or(DefId(0)),
        divergent,
        hint: hint.unwrap_or_default(),
        loc,
        body: Vec::new(),
    });
}

fn open_loop(context: &mut ParseContext, args: &str) {
    let divergent_break = match args {
        "" => false,
        "divergent_break" => true,
        _ => {
            context.error(format!("Unexpected loop attribute `{args}`"));
            false
        }
    };

    let loc = SourceLoc { line: context.line };
    context.stack.push(Frame::Loop { divergent_break, loc, body: Vec::new() });
}

fn open_else(context: &mut ParseContext) {
    match context.stack.pop() {
        Some(Frame::Then { cond, divergent, hint, loc, body }) => {
            let node = IfNode {
                cond,
                divergent,
                hint,
                then_body: body,
                else_body: Vec::new(),
                loc: Some(loc),
            };

            context.stack.push(Frame::Else { node, body: Vec::new() });
        }

        Some(frame) => {
            context.stack.push(frame);
            context.error("`else` without a matching `if`".to_owned());
        }

        None => context.error("`else` without a matching `if`".to_owned()),
    }
}

fn close(context: &mut ParseContext) {
    let node = match context.stack.pop() {
        Some(Frame::Then { cond, divergent, hint, loc, body }) => CfNode::If(IfNode {
            cond,
            divergent,
            hint,
            then_body: body,
            else_body: Vec::new(),
            loc: Some(loc),
        }),

        Some(Frame::Else { mut node, body }) => {
            node.else_body = body;
            CfNode::If(node)
        }

        Some(Frame::Loop { divergent_break, loc, body }) => {
            CfNode::Loop(LoopNode { divergent_break, body, loc: Some(loc) })
        }

        None => return context.error("unmatched `}`".to_owned()),
    };

    context.body().push(node);
}

fn parse_def(src: &str) -> Result<Def, String> {
    let (id, ty) = src.split_once(':').ok_or_else(|| format!("missing type for `{src}`"))?;
    let id = instruction::parse_ref(id.trim())?;
    let ty = ty.trim();

    let (divergent, shape) = match ty.split_at_checked(1) {
        Some(("u", shape)) => (false, shape),
        Some(("v", shape)) => (true, shape),
        _ => return Err(format!("invalid type `{ty}` (expected `u` or `v` prefix)")),
    };

    let (bits, components) = shape.split_once('x').unwrap_or((shape, "1"));

    let bit_size = match bits.parse::<u8>() {
        Ok(bits @ (1 | 8 | 16 | 32 | 64)) => bits,
        _ => return Err(format!("invalid bit size `{bits}`")),
    };

    let num_components = match components.parse::<u8>() {
        Ok(n @ 1..=16) => n,
        _ => return Err(format!("invalid component count `{components}`")),
    };

    if bit_size == 1 && num_components != 1 {
        return Err(format!("boolean vectors are not supported: `{ty}`"));
    }

    Ok(Def::new(id, bit_size, num_components, divergent))
}

fn parse_instruction(context: &mut ParseContext, line: &str) {
    let (def, rest) = match line.split_once('=') {
        Some((def, rest)) => (Some(def.trim()), rest.trim()),
        None => (None, line),
    };

    let (full_op, args) = rest.split_once(' ').unwrap_or((rest, ""));

    let mut args: Vec<_> = args.split(',').map(str::trim).collect();

    if args.last() == Some(&"") {
        args.pop();
    }

    let Ok(word) = full_op.parse::<Word>() else {
        return context.error(format!("Unknown instruction `{full_op}`"));
    };

    let def = match def.map(parse_def) {
        Some(Ok(def)) => Some(def),
        Some(Err(e)) => return context.error(e),
        None => None,
    };

    let Some(op) = instruction::op(context, word, full_op, &args) else {
        return;
    };

    match (&def, op.has_def()) {
        (None, true) => return context.error(format!("`{full_op}` must define a value")),
        (Some(_), false) => return context.error(format!("`{full_op}` does not produce a value")),
        _ => {}
    }

    if op.is_jump() && !context.in_loop() {
        return context.error(format!("`{full_op}` outside of a loop"));
    }

    if let Some(def) = def {
        if context.shader.declare(def).is_some() {
            context.error(format!("duplicate definition of `{}`", def.id));
        }
    }

    let instr = Instr::new(def, op).with_loc(SourceLoc { line: context.line });
    context.push_instr(instr);
}

fn parse_int(src: &str) -> Result<u64, String> {
    let (src, negative) = match src.strip_prefix('-') {
        Some(src) => (src, true),
        None => (src, false),
    };

    let (digits, base, base_name) = if let Some(src) = src.strip_prefix("0x") {
        (src, 16, "hex")
    } else if let Some(src) = src.strip_prefix("0b") {
        (src, 2, "binary")
    } else {
        (src, 10, "decimal")
    };

    let value =
        u64::from_str_radix(digits, base).map_err(|_| format!("invalid {base_name} number: {src}"))?;

    Ok(match negative {
        true => value.wrapping_neg(),
        false => value,
    })
}

fn test_len(context: &mut ParseContext, op: &str, expected: usize, actual: usize) -> bool {
    if actual != expected {
        context.error(format!("Expected {expected} argument(s) for `{op}`, found `{actual}`"));
        return true;
    }

    false
}
