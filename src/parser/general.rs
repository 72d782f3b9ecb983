use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, one_of, space0},
    combinator::{map_res, opt, recognize, rest},
    multi::many1,
    sequence::{preceded, tuple},
    IResult,
};

fn digits(input: &str) -> IResult<&str, &str> {
    recognize(many1(one_of("0123456789")))(input)
}

pub fn decimal_usize(input: &str) -> IResult<&str, usize> {
    map_res(digits, |out: &str| out.parse::<usize>())(input)
}

fn finite_float(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            alt((
                // Case one: .42
                recognize(tuple((char('.'), digits))),
                // Case two: 42, 42. and 42.42
                recognize(tuple((digits, opt(tuple((char('.'), opt(digits))))))),
            )),
            // Optional exponent: e42, E-42
            opt(tuple((one_of("eE"), opt(one_of("+-")), digits))),
        ))),
        |out: &str| out.parse::<f64>(),
    )(input)
}

/// `nan`, `inf` and `-inf` as written by numpy.
fn non_finite_float(input: &str) -> IResult<&str, f64> {
    let (i, (sign, word)) = tuple((
        opt(one_of("+-")),
        alt((tag_no_case("nan"), tag_no_case("inf"))),
    ))(input)?;
    let value = if word.eq_ignore_ascii_case("nan") {
        f64::NAN
    } else if sign == Some('-') {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    };
    Ok((i, value))
}

pub fn float(input: &str) -> IResult<&str, f64> {
    alt((non_finite_float, finite_float))(input)
}

/// Trailing blanks and an optional `#` comment up to the end of the line.
pub fn line_tail(input: &str) -> IResult<&str, Option<&str>> {
    preceded(space0, opt(preceded(char('#'), rest)))(input)
}
