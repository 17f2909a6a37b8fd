use super::EmailMessage;

fn wrap_html(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333;">
{body}
<p>Best regards,<br/>The Coursegate team</p>
</body>
</html>"#
    )
}

fn button(url: &str, label: &str) -> String {
    format!(
        r#"<p><a href="{url}" style="background-color: #0070f3; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; display: inline-block;">{label}</a></p>"#
    )
}

pub fn magic_link(to: &str, url: &str, ttl_minutes: i64) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Your sign-in link".to_string(),
        text: format!(
            "Hello!\n\nUse this link to sign in to your account:\n{url}\n\n\
             The link is valid for {ttl_minutes} minutes. If you did not request it, ignore this email."
        ),
        html: wrap_html(&format!(
            "<p>Hello!</p>\n<p>Click the button below to sign in to your account.</p>\n{}\n\
             <p>The link is valid for {ttl_minutes} minutes. If you did not request it, ignore this email.</p>",
            button(url, "Sign in")
        )),
    }
}

pub fn course_purchased(to: &str, username: &str, course_title: &str, dashboard_url: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Thank you for purchasing \"{course_title}\""),
        text: format!(
            "Dear {username},\n\nThank you for purchasing \"{course_title}\". \
             You now have lifetime access to the course materials.\n\nOpen your courses: {dashboard_url}"
        ),
        html: wrap_html(&format!(
            "<p>Dear {username},</p>\n<p>Thank you for purchasing \"{course_title}\". \
             You now have lifetime access to the course materials.</p>\n{}",
            button(dashboard_url, "Open my courses")
        )),
    }
}

pub fn platform_access_granted(
    to: &str,
    username: &str,
    tier: &str,
    slots: u32,
    dashboard_url: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Your \"{tier}\" platform access is active"),
        text: format!(
            "Dear {username},\n\nYour \"{tier}\" plan is now active and {slots} student slots \
             were added to your account.\n\nOpen your teacher dashboard: {dashboard_url}"
        ),
        html: wrap_html(&format!(
            "<p>Dear {username},</p>\n<p>Your \"{tier}\" plan is now active and {slots} student slots \
             were added to your account.</p>\n{}",
            button(dashboard_url, "Open teacher dashboard")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_link_mail_carries_url_and_lifetime() {
        let msg = magic_link("a@example.com", "http://app.test/auth/magic-link?token=abc", 15);
        assert_eq!(msg.to, "a@example.com");
        assert!(msg.text.contains("http://app.test/auth/magic-link?token=abc"));
        assert!(msg.html.contains("token=abc"));
        assert!(msg.text.contains("15 minutes"));
    }

    #[test]
    fn platform_mail_mentions_slots() {
        let msg = platform_access_granted("t@example.com", "tom", "pro", 50, "http://app.test/d");
        assert!(msg.subject.contains("pro"));
        assert!(msg.text.contains("50 student slots"));
    }
}
