use wavesel_ir::{DefId, Op};

use super::{ParseContext, parse_int, test_len};
use crate::parse::word::Word;

/// Parses the operands of `word`, returning `None` if any error was reported.
pub(super) fn op(context: &mut ParseContext, word: Word, full_op: &str, args: &[&str]) -> Option<Op> {
    let op = match word {
        Word::Const => {
            if args.is_empty() {
                context.error(format!("Expected at least 1 argument for `{full_op}`"));
                return None;
            }

            let values: Vec<_> = args.iter().map(|arg| context.consume(parse_int(arg))).collect();
            Op::Const(values.into_iter().collect::<Option<_>>()?)
        }

        Word::Undef => no_args(context, Op::Undef, full_op, args)?,
        Word::Terminate => no_args(context, Op::Terminate, full_op, args)?,
        Word::Demote => no_args(context, Op::Demote, full_op, args)?,
        Word::Break => no_args(context, Op::Break, full_op, args)?,
        Word::Continue => no_args(context, Op::Continue, full_op, args)?,

        Word::Alu(op) => {
            let len_err = test_len(context, full_op, op.arity(), args.len());
            let srcs = refs(context, args)?;
            if len_err {
                return None;
            }

            Op::Alu { op, srcs }
        }

        Word::Vec => Op::Vec(non_empty_refs(context, full_op, args)?),

        Word::Phi => {
            if args.is_empty() {
                context.error(format!("Expected at least 1 argument for `{full_op}`"));
                return None;
            }

            // phis may name values defined later in a loop, so these are checked once the whole
            // shader has been read.
            let srcs: Option<Vec<_>> =
                args.iter().map(|arg| context.consume(parse_ref(arg))).collect();
            let srcs = srcs?;
            let line = context.line;
            context.forward_refs.extend(srcs.iter().map(|&id| (line, id)));
            Op::Phi(srcs)
        }

        Word::Tex => {
            let (args, implicit_derivatives) = match args.split_last() {
                Some((&"implicit", rest)) => (rest, true),
                _ => (args, false),
            };

            Op::Tex { coords: non_empty_refs(context, full_op, args)?, implicit_derivatives }
        }

        Word::Extract => {
            if test_len(context, full_op, 2, args.len()) {
                return None;
            }

            let src = context.use_ref(args[0]);
            let index = context.consume(parse_int(args[1]));
            let index = context.consume(
                index?.try_into().map_err(|_| format!("component index out of range: `{}`", args[1])),
            );

            Op::Extract { src: src?, index: index? }
        }

        Word::LoadBuffer => {
            let (args, zero_fill) = match args.split_last() {
                Some((&"zero", rest)) => (rest, true),
                _ => (args, false),
            };

            if test_len(context, full_op, 2, args.len()) {
                return None;
            }

            let offset = context.use_ref(args[0]);
            let channels = context.consume(parse_int(args[1]));
            let channels = context.consume(match channels? {
                mask @ 1..=0xf => Ok(mask as u8),
                mask => Err(format!("invalid channel mask `{mask:#x}` (expected 0x1..=0xf)")),
            });

            Op::LoadBuffer { offset: offset?, channels: channels?, zero_fill }
        }

        Word::Convert { signed } => Op::Convert { src: single(context, full_op, args)?, signed },
        Word::Derivative(axis) => Op::Derivative { src: single(context, full_op, args)?, axis },
        Word::ReadFirstLane => Op::ReadFirstLane(single(context, full_op, args)?),
        Word::TerminateIf => Op::TerminateIf(single(context, full_op, args)?),
        Word::DemoteIf => Op::DemoteIf(single(context, full_op, args)?),
    };

    Some(op)
}

fn no_args(context: &mut ParseContext, op: Op, full_op: &str, args: &[&str]) -> Option<Op> {
    match test_len(context, full_op, 0, args.len()) {
        true => None,
        false => Some(op),
    }
}

fn single(context: &mut ParseContext, full_op: &str, args: &[&str]) -> Option<DefId> {
    if test_len(context, full_op, 1, args.len()) {
        return None;
    }

    context.use_ref(args[0])
}

fn refs(context: &mut ParseContext, args: &[&str]) -> Option<Vec<DefId>> {
    // resolve everything first so every bad reference gets reported.
    let ids: Vec<_> = args.iter().map(|arg| context.use_ref(arg)).collect();
    ids.into_iter().collect()
}

fn non_empty_refs(context: &mut ParseContext, full_op: &str, args: &[&str]) -> Option<Vec<DefId>> {
    if args.is_empty() {
        context.error(format!("Expected at least 1 argument for `{full_op}`"));
        return None;
    }

    refs(context, args)
}

pub(super) fn parse_ref(src: &str) -> Result<DefId, String> {
    let num = src.strip_prefix('%').ok_or_else(|| format!("expected a value, found `{src}`"))?;
    num.parse::<u32>().map(DefId).map_err(|_| format!("invalid value name: `{src}`"))
}
