//! SubRip reader for local caption files.
//!
//! The caption service is the usual source of cues. SRT files let a session
//! run without it: `SrtCaptionSource` (the CLI's `--srt`) serves a file parsed
//! here, and `--export` writes loaded captions back in the same format, so a
//! set fetched once can be replayed offline. Timestamps become whole
//! milliseconds and cues come out sorted by start.

use crate::cue::{CaptionSet, Cue};
use crate::error::{CaptionError, Result};

use nom::bytes::complete::{tag, take_while1, take_while_m_n};
use nom::character::complete::{digit1, line_ending, multispace0, multispace1, space0, space1};
use nom::combinator::{map_res, opt};
use nom::error::{convert_error, ErrorKind, VerboseError};
use nom::multi::many_till;
use nom::sequence::terminated;
use nom::{branch::alt, error_position, Err, IResult};

type ParseResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Parses SRT text into a caption set for `video_id`. Cues come out ordered by
/// start time; multi-line cue text is joined with `\n`.
pub fn parse_srt(video_id: &str, input: &str) -> Result<CaptionSet> {
    match srt_file(input) {
        Ok((_, cues)) => CaptionSet::new(video_id, cues),
        Err(Err::Error(err)) | Err(Err::Failure(err)) => {
            Err(CaptionError::ParseError(convert_error(input, err)))
        }
        Err(Err::Incomplete(_)) => Err(CaptionError::ParseError(
            "Incomplete data received by non-streaming parser.".to_string(),
        )),
    }
}

fn optional_bom(input: &str) -> ParseResult<Option<&str>> {
    opt(tag("\u{FEFF}"))(input)
}

fn srt_file(input: &str) -> ParseResult<Vec<Cue>> {
    let (input, _) = optional_bom(input)?;
    let (input, mut cues) = all_cues(input)?;
    let (input, _) = end_of_file(input)?;
    cues.sort_by_key(|c| c.start);
    Ok((input, cues))
}

fn all_cues(mut input: &str) -> ParseResult<Vec<Cue>> {
    let mut cues = Vec::new();
    loop {
        match cue(input) {
            Ok((rest, parsed)) => {
                cues.push(parsed);
                let (rest, _) = multispace0(rest)?;
                input = rest;
            }
            Err(_) if input.is_empty() => return Ok((input, cues)),
            Err(err) => return Err(err),
        }
    }
}

fn cue(input: &str) -> ParseResult<Cue> {
    let (input, _) = multispace0(input)?;
    let (input, _) = terminated(seq_num, multispace1)(input)?;
    let (input, (start, end)) = terminated(show_hide, line_ending)(input)?;
    let (input, lines) = cue_text(input)?;

    Ok((
        input,
        Cue {
            start,
            end,
            text: lines.join("\n"),
        },
    ))
}

fn end_of_file(input: &str) -> ParseResult<&str> {
    if input.is_empty() {
        Ok((input, input))
    } else {
        Err(Err::Error(error_position!(input, ErrorKind::Eof)))
    }
}

fn cue_text(input: &str) -> ParseResult<Vec<&str>> {
    let line = terminated(
        take_while1(|c: char| c != '\n' && c != '\r'),
        alt((line_ending, end_of_file)),
    );
    let (input, (lines, _)) = many_till(line, alt((line_ending, end_of_file)))(input)?;
    Ok((input, lines))
}

fn show_hide(input: &str) -> ParseResult<(u64, u64)> {
    let (input, start) = timestamp(input)?;
    let (input, _) = space1(input)?;
    let (input, _) = tag("-->")(input)?;
    let (input, _) = space1(input)?;
    let (input, end) = timestamp(input)?;
    let (input, _) = space0(input)?;
    Ok((input, (start, end)))
}

/// `hh:mm:ss,mmm` in milliseconds. Short fields are tolerated: `1:2:3,4` reads
/// as `01:02:03,400`.
fn timestamp(input: &str) -> ParseResult<u64> {
    let digits = |max: usize, pad_right: bool| {
        map_res(
            take_while_m_n(0, max, |c: char| c.is_ascii_digit()),
            move |s: &str| {
                let padded = if pad_right {
                    format!("{:0<width$}", s, width = max)
                } else {
                    format!("{:0>width$}", s, width = max)
                };
                padded.parse::<u64>()
            },
        )
    };

    let (input, hours) = digits(2, false)(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, minutes) = digits(2, false)(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, seconds) = digits(2, false)(input)?;
    let (input, _) = tag(",")(input)?;
    let (input, millis) = digits(3, true)(input)?;

    Ok((
        input,
        millis + seconds * 1000 + minutes * 60 * 1000 + hours * 60 * 60 * 1000,
    ))
}

fn seq_num(input: &str) -> ParseResult<usize> {
    map_res(digit1, |s: &str| s.parse())(input)
}
